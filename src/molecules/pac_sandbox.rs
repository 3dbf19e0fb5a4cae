// PAC 沙箱：在内置 JS 引擎中加载生成的脚本
//
// 用于生成后的可加载性校验，以及对照进程内解析结果。
// 浏览器中的真实执行不经过这里。

use anyhow::{Result, anyhow, bail};
use boa_engine::{Context, JsString, JsValue, Source, js_string};

pub struct PacSandbox {
    context: Context,
}

impl PacSandbox {
    pub fn load(script: &str) -> Result<Self> {
        let mut context = Context::default();
        context
            .eval(Source::from_bytes(script))
            .map_err(|e| anyhow!("PAC 脚本执行失败：{}", e))?;

        let mut sandbox = Self { context };
        if !sandbox.entry_point()?.is_callable() {
            bail!("PAC 脚本缺少 FindProxyForURL 入口");
        }
        Ok(sandbox)
    }

    pub fn find_proxy(&mut self, url: &str, host: &str) -> Result<String> {
        let entry = self.entry_point()?;
        let Some(function) = entry.as_callable() else {
            bail!("FindProxyForURL 不是函数");
        };

        let args = [
            JsValue::from(JsString::from(url)),
            JsValue::from(JsString::from(host)),
        ];
        let value = function
            .call(&JsValue::undefined(), &args, &mut self.context)
            .map_err(|e| anyhow!("调用 FindProxyForURL 失败：{}", e))?;

        self.stringify(&value)
    }

    // 在脚本的全局作用域里求值一个表达式，结果转为字符串
    pub fn evaluate(&mut self, expression: &str) -> Result<String> {
        let value = self
            .context
            .eval(Source::from_bytes(expression))
            .map_err(|e| anyhow!("表达式求值失败：{}", e))?;
        self.stringify(&value)
    }

    fn entry_point(&mut self) -> Result<JsValue> {
        self.context
            .global_object()
            .get(js_string!("FindProxyForURL"), &mut self.context)
            .map_err(|e| anyhow!("读取 FindProxyForURL 失败：{}", e))
    }

    fn stringify(&mut self, value: &JsValue) -> Result<String> {
        let text = value
            .to_string(&mut self.context)
            .map_err(|e| anyhow!("PAC 返回值无法转为字符串：{}", e))?;
        Ok(text.to_std_string_escaped())
    }
}
