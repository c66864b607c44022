//! Standard RPC handler set exposed to the peer.
//!
//! | Method     | Argument                          | Result                              |
//! |------------|-----------------------------------|-------------------------------------|
//! | `postMQTT` | `{topic, message: base64}`        | `{success}` or `{error}`            |
//! | `print`    | any JSON                          | `null`                              |
//! | `shell`    | command string                    | `{error, stdout, stderr}`           |
//!
//! `shell` runs `sh -c` on a short-lived worker thread and wakes the relay
//! loop through an `embassy-sync` [`Signal`], so the loop never blocks on a
//! child process.

use std::process::Command;
use std::sync::Arc;
use std::thread;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};
use serde::Serialize;
use serde_json::{Value, json};

use crate::app::ports::BusPort;
use crate::envelope::BusPublish;

use super::dispatcher::RpcDispatcher;

pub const METHOD_POST_MQTT: &str = "postMQTT";
pub const METHOD_PRINT: &str = "print";
pub const METHOD_SHELL: &str = "shell";

/// Register `postMQTT`, `print` and `shell` on `rpc`.
pub fn register_standard<B>(rpc: &mut RpcDispatcher, bus: B)
where
    B: BusPort + Clone + 'static,
{
    rpc.register(METHOD_POST_MQTT, move |arg| {
        let mut bus = bus.clone();
        async move { post_to_bus(&mut bus, arg) }
    });
    rpc.register(METHOD_PRINT, |arg| async move {
        info!("RPC print: {}", arg);
        Ok(Value::Null)
    });
    rpc.register(METHOD_SHELL, |arg| async move {
        let Value::String(command) = arg else {
            return Err("shell expects a command string".to_owned());
        };
        let output = run_shell(command).await;
        serde_json::to_value(output).map_err(|e| e.to_string())
    });
}

fn post_to_bus(bus: &mut impl BusPort, arg: Value) -> Result<Value, String> {
    let publish: BusPublish =
        serde_json::from_value(arg).map_err(|e| format!("postMQTT argument: {e}"))?;
    let payload = publish.decoded_message().map_err(|e| e.to_string())?;
    Ok(match bus.publish(&publish.topic, &payload) {
        Ok(()) => json!({ "success": "success" }),
        Err(e) => {
            warn!("RPC postMQTT to '{}' failed: {}", publish.topic, e);
            json!({ "error": e.to_string() })
        }
    })
}

// ── Shell ────────────────────────────────────────────────────

/// Captured result of a shell command. A non-zero exit lands in `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellOutput {
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    fn failed(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

fn execute(command: &str) -> ShellOutput {
    info!("RPC shell: executing");
    match Command::new("sh").arg("-c").arg(command).output() {
        Ok(out) => {
            info!("RPC shell: finished ({})", out.status);
            ShellOutput {
                error: (!out.status.success()).then(|| out.status.to_string()),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            }
        }
        Err(e) => ShellOutput::failed(e),
    }
}

/// Run `command` off the relay thread; resolves when the child exits.
pub async fn run_shell(command: String) -> ShellOutput {
    let done: Arc<Signal<CriticalSectionRawMutex, ShellOutput>> = Arc::new(Signal::new());
    let tx = done.clone();

    let spawned = thread::Builder::new()
        .name("rpc-shell".into())
        .spawn(move || tx.signal(execute(&command)));

    if let Err(e) = spawned {
        warn!("RPC shell: could not spawn worker: {}", e);
        return ShellOutput::failed(e);
    }
    done.wait().await
}
