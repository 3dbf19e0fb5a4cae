// 日志初始化：基于 env_logger，默认 info 级别，可由 RUST_LOG 覆盖。
// 多次调用只生效一次；宿主已安装 logger 时静默跳过。

use env_logger::Env;
use once_cell::sync::OnceCell;

static LOGGER_READY: OnceCell<()> = OnceCell::new();

pub fn init() {
    LOGGER_READY.get_or_init(|| {
        let result = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .format_timestamp_millis()
            .try_init();

        if result.is_ok() {
            log::debug!("日志系统初始化完成");
        }
    });
}
