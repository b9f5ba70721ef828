//! 跨模块共享的常量

/// 不参与指标统计、也不参与限流的路径
pub const IGNORED_PATHS: [&str; 2] = ["/health", "/metrics"];

/// 应用名缺省值
pub const DEFAULT_APP_NAME: &str = "myapp-hello";

/// 服务端口缺省值
pub const DEFAULT_PORT: u16 = 3001;

/// 判断路径是否在忽略集合里
pub fn is_ignored_path(path: &str) -> bool {
    IGNORED_PATHS.contains(&path)
}
