//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS / 读取页面"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::AppResult;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() / content() 能力
/// - 不认识服务器 / 画质
/// - 不处理解析流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于点击等其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 当前渲染后的完整 HTML
    pub async fn content(&self) -> AppResult<String> {
        Ok(self.page.content().await?)
    }

    /// 当前页面标题
    pub async fn title(&self) -> AppResult<String> {
        self.eval_as::<String>("document.title").await
    }

    /// 页面正文与标题（小写），用于拦截检测
    pub async fn visible_text(&self) -> AppResult<String> {
        self.eval_as::<String>(
            r#"(() => {
                const body = (document.body && document.body.textContent) || '';
                return (document.title + '\n' + body).toLowerCase();
            })()"#,
        )
        .await
    }

    /// 关闭页面
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!("关闭页面失败: {}", e);
        }
    }
}
