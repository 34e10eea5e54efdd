mod attendance;
mod cache;
mod config;
mod debounce;
mod draft;
mod ipc;
mod question;
mod telemetry;

use std::io::{self, BufRead, Write};

fn main() {
    // A broken config file must not keep the console from starting.
    let (cfg, cfg_error) = match config::Config::load_from_env() {
        Ok(cfg) => (cfg, None),
        Err(e) => (config::Config::default(), Some(e)),
    };
    telemetry::init_tracing(&cfg.log);
    if let Some(e) = cfg_error {
        tracing::warn!("using default config: {e:#}");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        debounce_ms = cfg.search.debounce_ms,
        "classdeskd ready"
    );

    let mut state = ipc::AppState::new(cfg);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!("stdin read failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!("unparsable request: {e}");
                let _ = writeln!(
                    stdout,
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, exiting");
}
