use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Answers every keyboard-interactive prompt with the inventory password.
/// EOS lab images only offer keyboard-interactive to some accounts.
struct InventoryPassword<'a>(&'a str);

impl ssh2::KeyboardInteractivePrompt for InventoryPassword<'_> {
    fn prompt<'b>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'b>],
    ) -> Vec<String> {
        vec![self.0.to_string(); prompts.len()]
    }
}

/// Inventory `hostname` check: up to 253 chars of ASCII letters, digits, `-`, `.` or `_`.
/// Anything else is rejected before the value reaches a socket address.
pub fn is_valid_hostname(hostname: &str) -> bool {
    (1..=253).contains(&hostname.len())
        && hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// Open an authenticated session to a lab device. Blocking; run it on the
/// blocking pool. `timeout_secs` bounds the TCP connect and every read/write.
pub fn ssh_connect(
    host: &str,
    port: u16,
    user: &str,
    pass: &str,
    timeout_secs: u64,
) -> Result<ssh2::Session, String> {
    let timeout = Duration::from_secs(timeout_secs);

    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("Cannot resolve {}:{}: {}", host, port, e))?
        .next()
        .ok_or_else(|| format!("No address found for {}", host))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| format!("TCP connection to {} failed: {}", addr, e))?;
    tcp.set_read_timeout(Some(timeout)).ok();
    tcp.set_write_timeout(Some(timeout)).ok();

    let mut session = ssh2::Session::new()
        .map_err(|e| format!("Failed to create SSH session: {}", e))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    session.handshake()
        .map_err(|e| format!("SSH handshake with {} failed: {}", host, e))?;

    // password auth errors are not fatal, keyboard-interactive is tried next
    let _ = session.userauth_password(user, pass);
    if !session.authenticated() {
        let _ = session.userauth_keyboard_interactive(user, &mut InventoryPassword(pass));
    }

    if session.authenticated() {
        Ok(session)
    } else {
        Err(format!("SSH authentication as {} on {} failed", user, host))
    }
}

/// Feed a configure-session payload to the device CLI and return everything
/// it printed. The CLI only enters config mode on a PTY shell. Blocking.
pub fn ssh_run_interactive(
    host: &str,
    port: u16,
    user: &str,
    pass: &str,
    payload: &str,
    timeout_secs: u64,
) -> Result<String, String> {
    let session = ssh_connect(host, port, user, pass, timeout_secs)?;

    let mut channel = session.channel_session()
        .map_err(|e| format!("Failed to open channel: {}", e))?;

    channel.request_pty("vt100", None, None)
        .map_err(|e| format!("Failed to request PTY: {}", e))?;
    channel.shell()
        .map_err(|e| format!("Failed to start shell: {}", e))?;

    channel.write_all(payload.as_bytes())
        .and_then(|_| channel.write_all(b"\nexit\n"))
        .map_err(|e| format!("Failed to send payload: {}", e))?;
    channel.send_eof()
        .map_err(|e| format!("Failed to send EOF: {}", e))?;

    let mut output = String::new();
    channel.read_to_string(&mut output)
        .map_err(|e| format!("Failed to read output: {}", e))?;

    channel.wait_close()
        .map_err(|e| format!("Failed to close channel: {}", e))?;

    Ok(output)
}

/// `ssh_run_interactive` on tokio's blocking pool
pub async fn ssh_run_interactive_async(
    host: &str,
    port: u16,
    user: &str,
    pass: &str,
    payload: &str,
    timeout_secs: u64,
) -> Result<String, String> {
    let host = host.to_string();
    let user = user.to_string();
    let pass = pass.to_string();
    let payload = payload.to_string();

    tokio::task::spawn_blocking(move || {
        ssh_run_interactive(&host, port, &user, &pass, &payload, timeout_secs)
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
}
