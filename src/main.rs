// ==========================================
// SMART CALDA - 命令行入口
// ==========================================
// 用法:
//   smart-calda                       打印当前看板概览
//   smart-calda <planilha.xlsx|.csv>  导入本地文件后打印概览
//   smart-calda --remote [url]        从远程地址导入后打印概览
//
// 数据库路径: SMART_CALDA_DB_PATH 或用户数据目录
// ==========================================

use std::path::PathBuf;

use smart_calda::app::{get_default_db_path, AppState};
use smart_calda::{logging, APP_NAME, VERSION};

/// 导入来源
enum ImportSource {
    None,
    File(PathBuf),
    Remote(Option<String>),
}

fn parse_args() -> ImportSource {
    let mut args = std::env::args().skip(1);
    match args.next() {
        None => ImportSource::None,
        Some(flag) if flag == "--remote" => {
            ImportSource::Remote(args.next().filter(|s| !s.trim().is_empty()))
        }
        Some(path) => ImportSource::File(PathBuf::from(path)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    tracing::info!("{} v{}", APP_NAME, VERSION);

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path)?;

    let imported = match parse_args() {
        ImportSource::None => None,
        ImportSource::File(path) => Some(state.import_api.import_file(&path).await),
        ImportSource::Remote(url) => Some(state.import_api.import_remote(url.as_deref()).await),
    };

    match imported {
        Some(Ok(summary)) => eprintln!("{}", summary.message()),
        Some(Err(e)) => {
            tracing::error!(error = %e, "导入失败");
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
        None => {}
    }

    let overview = state.dashboard_api.overview()?;
    println!("{}", serde_json::to_string_pretty(&overview)?);
    Ok(())
}
