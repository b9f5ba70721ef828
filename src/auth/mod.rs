//! 认证和授权模块
//!
//! 提供JWT校验和路由级的授权守卫

pub mod middleware;
pub mod jwt;

// 重新导出常用类型
pub use jwt::{Identity, JwtService, TokenError};
pub use middleware::{AuthGuard, RouteAccess};

use thiserror::Error;

/// 授权失败的原因
///
/// 对外只暴露两种文案：`Unauthorized` 和 `Invalid token`。
/// 缺少签名密钥属于服务端配置问题，但对客户端同样表现为 `Unauthorized`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("缺少 Bearer token")]
    MissingToken,
    #[error("未配置 JWT 签名密钥")]
    MissingSecret,
    #[error("无效的Token")]
    InvalidToken,
}

impl AuthError {
    /// 返回给客户端的固定文案
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken | AuthError::MissingSecret => "Unauthorized",
            AuthError::InvalidToken => "Invalid token",
        }
    }
}
