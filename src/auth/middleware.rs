//! 授权守卫中间件
//!
//! 每条路由在注册时声明 [`RouteAccess`]，由同一个 [`auth_middleware`] 负责判定。
//! 只有 token 校验失败会被转换成 `Invalid token`，其余错误原样向上传播。

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use super::{AuthError, Identity, JwtService};
use crate::shared::AppError;

/// 路由访问级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// 无需认证
    Public,
    /// 需要有效的 Bearer token
    Protected,
}

/// 绑定到单条路由的授权守卫
#[derive(Debug, Clone)]
pub struct AuthGuard {
    access: RouteAccess,
    jwt: Option<Arc<JwtService>>,
}

impl AuthGuard {
    /// `jwt` 为空表示没有配置签名密钥
    pub fn new(access: RouteAccess, jwt: Option<Arc<JwtService>>) -> Self {
        Self { access, jwt }
    }

    /// 判定请求是否放行，放行且带身份时返回解码后的 payload
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Option<Identity>, AuthError> {
        if self.access == RouteAccess::Public {
            return Ok(None);
        }

        let token = extract_bearer_token(headers).ok_or(AuthError::MissingToken)?;

        let Some(jwt) = self.jwt.as_ref() else {
            tracing::error!("JWT_SECRET 未配置，受保护路由全部拒绝");
            return Err(AuthError::MissingSecret);
        };

        match jwt.verify_token(token) {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                tracing::debug!(error = %e, "token 校验失败");
                Err(AuthError::InvalidToken)
            }
        }
    }
}

/// JWT认证中间件
pub async fn auth_middleware(
    State(guard): State<AuthGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(identity) = guard.authorize(request.headers())? {
        // 将身份信息添加到请求扩展中
        request.extensions_mut().insert(identity);
    }

    Ok(next.run(request).await)
}

/// 给路由挂上授权守卫
pub fn with_access<S>(route: MethodRouter<S>, guard: AuthGuard) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(guard, auth_middleware))
}

/// 从Authorization header中提取Bearer token
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}
