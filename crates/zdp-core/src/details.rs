//! 本机管理 API 客户端（`GET /api/v1.0/get-zdpe-details`）。
//!
//! 说明：
//! - HTTPS：服务使用自签名证书，关闭证书校验
//! - HTTP：明文访问同一接口
//! - 无论状态码如何，响应体原样返回；连接失败/超时/读取失败按传输错误返回
//! - 只访问本机回环地址，不使用环境变量或系统配置的代理
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::fmt;

use tracing::{debug, info};

use crate::config::{ApiConfig, API_DETAILS_PATH};
use crate::error::{Result, ZdpError};

/// 访问方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Https,
    Http,
}

impl Transport {
    pub fn scheme(self) -> &'static str {
        match self {
            Transport::Https => "https",
            Transport::Http => "http",
        }
    }

    /// 用于错误信息的名称。
    pub fn label(self) -> &'static str {
        match self {
            Transport::Https => "HTTPS",
            Transport::Http => "HTTP",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 组装详情接口地址。
pub fn details_url(api: &ApiConfig, transport: Transport) -> String {
    format!(
        "{}://{}:{}{}",
        transport.scheme(),
        api.host,
        api.port,
        API_DETAILS_PATH
    )
}

/// 获取服务详情。
///
/// 参数：
/// - `api`：地址与超时
/// - `transport`：HTTPS 或 HTTP
///
/// 返回值：
/// - 响应体文本
///
/// 异常处理：
/// - 客户端构建、请求发送、响应读取失败均返回 [`ZdpError::Transport`]
pub async fn fetch_details(api: &ApiConfig, transport: Transport) -> Result<String> {
    let url = details_url(api, transport);
    let wrap = |source| ZdpError::Transport {
        transport: transport.label(),
        url: url.clone(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(api.timeout())
        .no_proxy()
        .danger_accept_invalid_certs(transport == Transport::Https)
        .build()
        .map_err(wrap)?;

    info!("请求服务详情: {url}");
    let resp = client.get(&url).send().await.map_err(wrap)?;
    debug!("服务详情响应状态: {}", resp.status());
    resp.text().await.map_err(wrap)
}
