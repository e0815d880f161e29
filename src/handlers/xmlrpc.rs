use regex::Regex;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use thiserror::Error;

/// curl's exit status for `--max-time` expiry.
const CURL_TIMEOUT: i32 = 28;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("curl exited with {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("server returned fault: {0}")]
    Fault(String),

    #[error("unable to run curl: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Endpoint plus basic-auth credentials for one XML-RPC server.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url:          String,
    pub user:         String,
    pub password:     String,
    pub timeout_secs: u64,
}

/// `<methodCall>` document with one `<param>` per value.
pub fn method_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall>");
    out.push_str(&format!("<methodName>{}</methodName><params>", escape(method)));
    for p in params {
        out.push_str("<param>");
        encode_value(p, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

/// JSON → XML-RPC. `null` has no XML-RPC type without the nil extension,
/// so it goes out as an empty string.
pub fn encode_value(v: &Value, out: &mut String) {
    out.push_str("<value>");
    match v {
        Value::Null      => out.push_str("<string></string>"),
        Value::Bool(b)   => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
        Value::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => out.push_str(&format!("<int>{}</int>", i)),
            None    => out.push_str(&format!("<double>{}</double>", n.as_f64().unwrap_or(0.0))),
        },
        Value::String(s) => out.push_str(&format!("<string>{}</string>", escape(s))),
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Object(map) => {
            out.push_str("<struct>");
            for (k, item) in map {
                out.push_str(&format!("<member><name>{}</name>", escape(k)));
                encode_value(item, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// XML text escaping. C0 controls other than tab, LF and CR are not legal
/// XML characters and become U+FFFD.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

/// `faultString` of a `<fault>` response, if the response is one.
pub fn fault_string(response: &str) -> Option<String> {
    if !response.contains("<fault>") {
        return None;
    }
    static FAULT: OnceLock<Option<Regex>> = OnceLock::new();
    let re = FAULT.get_or_init(|| {
        Regex::new(r"(?s)<name>faultString</name>\s*<value>\s*(?:<string>)?(.*?)(?:</string>)?\s*</value>").ok()
    });
    let msg = re
        .as_ref()
        .and_then(|re| re.captures(response))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| "unknown fault".to_string());
    Some(msg)
}

/// curl config file carrying the basic-auth credentials, so the password
/// never appears in argv.
pub fn curl_config(ep: &Endpoint) -> String {
    let quote = |v: &str| v.replace('\\', "\\\\").replace('"', "\\\"");
    format!("user = \"{}:{}\"\n", quote(&ep.user), quote(&ep.password))
}

/// Argument list for one POST. The body is read from stdin (`@-`).
pub fn curl_args(ep: &Endpoint, config: &Path) -> Vec<String> {
    vec![
        "-s".into(), "-S".into(), "--fail".into(),
        "--max-time".into(), ep.timeout_secs.to_string(),
        "--config".into(), config.to_string_lossy().into_owned(),
        "-X".into(), "POST".into(),
        "-H".into(), "Content-Type: text/xml".into(),
        "--data-binary".into(), "@-".into(),
        ep.url.clone(),
    ]
}

/// POST one call through curl, bounded by `timeout_secs` for the whole exchange.
pub fn call(ep: &Endpoint, method: &str, params: &[Value]) -> Result<String, TransportError> {
    let body = method_call(method, params);
    log::debug!("xml-rpc {} → {} ({} bytes)", method, ep.url, body.len());

    // NamedTempFile is created 0600.
    let mut auth = tempfile::NamedTempFile::new()?;
    auth.write_all(curl_config(ep).as_bytes())?;
    auth.flush()?;

    let mut child = Command::new("curl")
        .args(curl_args(ep, auth.path()))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        // curl reports its own failure if it stopped reading early.
        if let Err(e) = stdin.write_all(body.as_bytes()) {
            log::debug!("writing request body to curl: {}", e);
        }
    }
    let out = child.wait_with_output()?;

    match out.status.code() {
        Some(0) => {}
        Some(CURL_TIMEOUT) => return Err(TransportError::Timeout(ep.timeout_secs)),
        code => {
            return Err(TransportError::Failed {
                code:   code.unwrap_or(-1),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            })
        }
    }

    let response = String::from_utf8_lossy(&out.stdout).into_owned();
    match fault_string(&response) {
        Some(f) => Err(TransportError::Fault(f)),
        None    => Ok(response),
    }
}
