//! 成绩单解析服务客户端
//!
//! 解析本身由外部服务完成（POST /api/parse-transcript）。
//! 这里只负责上传前的文件检查、转发请求和解读错误响应。

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;

/// 支持的成绩单格式
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("mhtml", "application/x-mimearchive"),
    ("pdf", "application/pdf"),
];

/// 解析服务返回的成绩单及文件信息
#[derive(Debug, Clone)]
pub struct ParsedTranscript {
    /// 解析服务返回的原始JSON
    pub data: Value,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    /// 文件内容的SHA-256
    pub sha256: String,
}

/// 检查上传文件，返回要使用的MIME类型
pub fn check_upload(file_name: &str, bytes: &[u8], max_bytes: u64) -> Result<&'static str> {
    if bytes.is_empty() {
        bail!("文件为空: {}", file_name);
    }

    if bytes.len() as u64 > max_bytes {
        bail!(
            "文件大小超过上限: {} 字节 > {} 字节",
            bytes.len(),
            max_bytes
        );
    }

    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if let Some((_, mime)) = ALLOWED_TYPES.iter().find(|(ext, _)| *ext == extension) {
        return Ok(*mime);
    }

    // 扩展名不可靠时按内容识别，只接受PDF
    match infer::get(bytes).map(|t| t.mime_type()) {
        Some("application/pdf") => Ok("application/pdf"),
        _ => bail!("不支持的文件类型，请上传从CAMU导出的HTML、MHTML或PDF文件"),
    }
}

/// 文件内容指纹
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// 解析服务客户端
pub struct ParserClient {
    /// 服务基础地址
    endpoint: String,
    /// HTTP客户端
    client: reqwest::Client,
    /// 上传大小上限
    max_upload_bytes: u64,
}

impl ParserClient {
    /// 创建新的客户端
    pub fn new(endpoint: &str, timeout: Duration, max_upload_bytes: u64) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            bail!("解析服务地址为空");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            endpoint,
            client,
            max_upload_bytes,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 读取文件并交给解析服务
    pub async fn parse_file(&self, path: &Path) -> Result<ParsedTranscript> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("读取文件失败: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "transcript".to_string());

        self.parse_bytes(&file_name, bytes).await
    }

    /// 上传文件内容并返回解析结果
    pub async fn parse_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<ParsedTranscript> {
        let mime_type = check_upload(file_name, &bytes, self.max_upload_bytes)?;
        let sha256 = fingerprint(&bytes);
        let size = bytes.len() as u64;

        tracing::info!(file = file_name, mime = mime_type, size, "发送成绩单到解析服务");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/parse-transcript", self.endpoint))
            .multipart(form)
            .send()
            .await
            .context("无法连接成绩单解析服务")?;

        let status = response.status();
        let body: Value = response.json().await.context("解析服务返回了无效的JSON")?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Failed to parse transcript");
            return Err(anyhow!("解析服务错误 ({}): {}", status, message));
        }

        Ok(ParsedTranscript {
            data: body,
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            size,
            sha256,
        })
    }

    /// 解析服务健康检查
    pub async fn health(&self) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/healthcheck", self.endpoint))
            .send()
            .await
            .context("成绩单解析服务不可用")?;

        let status = response.status();
        if !status.is_success() {
            bail!("解析服务返回错误状态: {}", status);
        }

        Ok(response.json().await?)
    }
}
