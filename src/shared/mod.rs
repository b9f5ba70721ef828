//! 共享模块
//! 
//! 包含跨层共享的错误处理和常量

pub mod error;
pub mod constants;

// 重新导出常用类型
pub use error::{AppError, AppResult};
