/// STDIO Transport
///
/// Newline-delimited JSON-RPC 2.0 over stdin/stdout. One request per line,
/// one response per line. Logs go to stderr so they never interleave with
/// protocol output.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::core::rpc::{self, PARSE_ERROR, RpcRequest, RpcResponse};
use crate::core::state::AppState;

/// Serve JSON-RPC on the process's stdin/stdout until stdin closes.
pub async fn run_server_stdio(state: AppState) -> std::io::Result<()> {
    tracing::info!(
        name = %state.server_name,
        version = %state.server_version,
        "STDIO server starting"
    );

    // 8KB buffers on both ends
    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    serve(&state, stdin, stdout).await
}

/// Process requests line by line from `input`, writing responses to `output`.
pub async fn serve<R, W>(state: &AppState, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let Some(response) = respond(state, &line).await else {
            continue;
        };

        let response_json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                continue;
            }
        };

        output.write_all(response_json.as_bytes()).await?;
        output.write_all(b"\n").await?;
        // Flush per response; clients wait on each reply
        output.flush().await?;
    }

    tracing::info!("stdin closed, STDIO server stopping");
    Ok(())
}

async fn respond(state: &AppState, line: &str) -> Option<RpcResponse> {
    match serde_json::from_str::<RpcRequest>(line) {
        Ok(req) => rpc::handle_request(state, req).await,
        Err(e) => {
            tracing::warn!(error = %e, "malformed JSON-RPC request");
            // Answer only when there is an id to answer to
            let id = serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|v| v.get("id").cloned())
                .filter(|id| !id.is_null())?;
            Some(RpcResponse::error(Some(id), PARSE_ERROR, format!("Parse error: {e}")))
        }
    }
}
