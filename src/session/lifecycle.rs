//! Session lifecycle and the blocking [`run_session`] entry point.
//!
//! A session binds one UDP socket and runs four concurrent loops on a tokio
//! runtime:
//!
//! 1. receive: bounded `recv`, dispatch through [`SessionState`]
//! 2. punch: NAT keepalive via [`HolePuncher`]
//! 3. handshake driver: guest HS1 resend or host wait, bounded by a deadline
//! 4. foreground: one input line per message until `/exit`, end of input,
//!    or Ctrl-C
//!
//! Teardown stops the run flag, drops the keys, and resets the cache file.

use std::fmt;
use std::io::{BufRead, Write};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::core::{RECV_BUFFER_SIZE, SessionConfig, SessionError};
use crate::crypto::SessionCode;
use crate::guard::AllowList;
use crate::identity::{ClientIdProvider, DeviceFingerprint};
use crate::transport::{NoLookup, PeerSocket, PublicIpLookup, discover_public_addr};

use super::cache::{CacheEntry, SessionCache};
use super::handshake::Role;
use super::punch::HolePuncher;
use super::retry::{RetryOutcome, RunFlag, retry_with_deadline};
use super::state::{SessionEvent, SessionState};

/// Input line that ends the session.
pub const EXIT_COMMAND: &str = "/exit";

/// The role chosen in the shell, with its validated answers.
#[derive(Debug, Clone)]
pub enum RoleSelection {
    /// Host a new session.
    Host {
        /// Code to share with the guest.
        code: SessionCode,
    },
    /// Join a host.
    Guest {
        /// Code received from the host.
        code: SessionCode,
        /// Host public address and port.
        host_addr: SocketAddr,
    },
}

impl RoleSelection {
    /// Host with a freshly generated code.
    pub fn host() -> Self {
        Self::host_with_code(SessionCode::generate())
    }

    /// Host with a given code.
    pub fn host_with_code(code: SessionCode) -> Self {
        Self::Host { code }
    }

    /// Join a host, validating the shell answers.
    ///
    /// The code must be exactly 16 digits, the IP a literal address, and the
    /// port a non-zero number.
    pub fn guest(code: &str, ip: &str, port: &str) -> Result<Self, SessionError> {
        let code = SessionCode::parse(code)?;
        let invalid = || SessionError::InvalidHostAddress(format!("{}:{}", ip.trim(), port.trim()));
        let ip: IpAddr = ip.trim().parse().map_err(|_| invalid())?;
        let port: u16 = port.trim().parse().map_err(|_| invalid())?;
        if port == 0 || ip.is_unspecified() {
            return Err(invalid());
        }
        Ok(Self::Guest {
            code,
            host_addr: SocketAddr::new(ip, port),
        })
    }

    /// Role of this selection.
    pub fn role(&self) -> Role {
        match self {
            Self::Host { .. } => Role::Host,
            Self::Guest { .. } => Role::Guest,
        }
    }
}

/// Collaborators and settings of a session.
pub struct SessionEnv {
    config: SessionConfig,
    ip_lookup: Box<dyn PublicIpLookup>,
    client_ids: Box<dyn ClientIdProvider>,
    allow_list: Option<AllowList>,
}

impl SessionEnv {
    /// Default collaborators: HTTP address lookup, device fingerprint, and
    /// the allow list file named in `config`.
    pub fn new(config: SessionConfig) -> Self {
        let ip_lookup = default_lookup(&config);
        Self {
            config,
            ip_lookup,
            client_ids: Box::new(DeviceFingerprint::new()),
            allow_list: None,
        }
    }

    /// Replace the public address lookup.
    pub fn with_ip_lookup(mut self, lookup: impl PublicIpLookup + 'static) -> Self {
        self.ip_lookup = Box::new(lookup);
        self
    }

    /// Replace the client identifier source.
    pub fn with_client_ids(mut self, provider: impl ClientIdProvider + 'static) -> Self {
        self.client_ids = Box::new(provider);
        self
    }

    /// Use this allow list instead of loading the file.
    pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn allow_list(&mut self) -> AllowList {
        if let Some(list) = self.allow_list.take() {
            return list;
        }
        let path = &self.config.allow_list_path;
        AllowList::load(path).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "failed to load allow list, admitting nobody");
            AllowList::new()
        })
    }
}

impl fmt::Debug for SessionEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEnv")
            .field("config", &self.config)
            .field("allow_list", &self.allow_list)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "discovery")]
fn default_lookup(config: &SessionConfig) -> Box<dyn PublicIpLookup> {
    match crate::transport::HttpIpLookup::from_config(config) {
        Ok(lookup) => Box::new(lookup),
        Err(err) => {
            warn!(%err, "HTTP address lookup unavailable");
            Box::new(NoLookup)
        }
    }
}

#[cfg(not(feature = "discovery"))]
fn default_lookup(_config: &SessionConfig) -> Box<dyn PublicIpLookup> {
    Box::new(NoLookup)
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Role played.
    pub role: Role,
    /// Authenticated peer, if the handshake completed.
    pub peer: Option<SocketAddr>,
    /// Messages sent to the peer.
    pub messages_sent: usize,
    /// Messages received from the peer.
    pub messages_received: usize,
}

/// Line-oriented user output shared by the session loops.
struct Console<O> {
    out: Mutex<O>,
}

impl<O: Write> Console<O> {
    fn new(out: O) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn line(&self, text: impl fmt::Display) {
        match self.out.lock() {
            Ok(mut out) => {
                if let Err(err) = writeln!(out, "{text}").and_then(|()| out.flush()) {
                    debug!(%err, "failed to write session output");
                }
            }
            Err(_) => debug!("session output lock poisoned"),
        }
    }
}

/// An open session: socket bound, state initialized, banner printed.
pub struct Session<O> {
    role: Role,
    config: SessionConfig,
    socket: Arc<PeerSocket>,
    state: Arc<RwLock<SessionState>>,
    cache: SessionCache,
    console: Arc<Console<O>>,
}

impl<O: Write + Send + 'static> Session<O> {
    /// Bind the socket and prepare the chosen role.
    pub async fn open(
        selection: RoleSelection,
        mut env: SessionEnv,
        output: O,
    ) -> Result<Self, SessionError> {
        env.config.validate()?;
        let config = env.config.clone();
        let console = Arc::new(Console::new(output));
        let socket = PeerSocket::bind(config.bind_addr)
            .await
            .map_err(SessionError::Bind)?;
        let port = socket.local_addr()?.port();
        let cache = SessionCache::new(&config.cache_path);
        let role = selection.role();

        let (state, entry) = match selection {
            RoleSelection::Host { code } => {
                let public = discover_public_addr(env.ip_lookup.as_ref()).await;
                console.line(format_args!("Your session code: {}", code.as_str()));
                console.line(format_args!("Your public IP: {public}"));
                console.line(format_args!("Listening port: {port}"));
                console.line("Waiting for guest handshake packet...");

                let state = SessionState::host(&config, env.allow_list(), code.token())?;
                (state, CacheEntry::now(Role::Host, public.to_string(), port))
            }
            RoleSelection::Guest { code, host_addr } => {
                let client_id = env.client_ids.client_id();
                console.line(format_args!("Your client id: {client_id}"));
                console.line("Sending handshake to host...");

                let state = SessionState::guest(&config, client_id, code.token(), host_addr)?;
                let entry = CacheEntry::now(Role::Guest, host_addr.ip().to_string(), host_addr.port());
                (state, entry)
            }
        };

        if let Err(err) = cache.write(&entry) {
            warn!(path = %cache.path().display(), %err, "failed to write session cache");
        }
        info!(%role, port, "session open");

        Ok(Self {
            role,
            config,
            socket: Arc::new(socket),
            state: Arc::new(RwLock::new(state)),
            cache,
            console,
        })
    }

    /// Local socket address.
    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.socket.local_addr()?)
    }

    /// Shared session state.
    pub fn state(&self) -> Arc<RwLock<SessionState>> {
        self.state.clone()
    }

    /// Run until `/exit`, end of `lines`, or Ctrl-C, then tear down.
    pub async fn run(self, mut lines: mpsc::UnboundedReceiver<String>) -> SessionReport {
        let flag = Arc::new(RunFlag::start());
        let received = Arc::new(AtomicUsize::new(0));

        let receiver = tokio::spawn(receive_loop(
            self.socket.clone(),
            self.state.clone(),
            self.console.clone(),
            flag.clone(),
            received.clone(),
            self.config.clone(),
        ));
        let puncher = {
            let puncher = HolePuncher::new(
                self.socket.clone(),
                self.state.clone(),
                self.config.punch_interval,
            );
            let flag = flag.clone();
            tokio::spawn(async move { puncher.run(&flag).await })
        };
        let driver = tokio::spawn(drive_handshake(
            self.role,
            self.socket.clone(),
            self.state.clone(),
            self.console.clone(),
            flag.clone(),
            self.config.clone(),
        ));
        let interrupt = {
            let flag = flag.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupted");
                    flag.stop();
                }
            })
        };

        let mut sent = 0;
        loop {
            let line = tokio::select! {
                line = lines.recv() => line,
                _ = flag.stopped() => None,
            };
            let Some(line) = line else { break };
            let text = line.trim_end_matches(['\r', '\n']);
            if text.trim() == EXIT_COMMAND {
                break;
            }
            if text.is_empty() {
                continue;
            }
            if self.send_line(text).await {
                sent += 1;
            }
        }

        flag.stop();
        interrupt.abort();
        for task in [receiver, puncher, driver] {
            if let Err(err) = task.await {
                debug!(%err, "session task ended abnormally");
            }
        }

        let peer = {
            let mut state = self.state.write().await;
            let peer = state.peer_addr();
            state.close();
            peer
        };
        if let Err(err) = self.cache.clear() {
            warn!(path = %self.cache.path().display(), %err, "failed to clear session cache");
        }
        self.console.line("Session closed. Cache cleared.");
        info!(role = %self.role, "session closed");

        SessionReport {
            role: self.role,
            peer,
            messages_sent: sent,
            messages_received: received.load(Ordering::SeqCst),
        }
    }

    async fn send_line(&self, text: &str) -> bool {
        let sealed = self.state.read().await.seal(text);
        match sealed {
            Ok((frame, peer)) => match self.socket.send_frame(&frame, peer).await {
                Ok(_) => true,
                Err(err) => {
                    warn!(%peer, %err, "failed to send message");
                    false
                }
            },
            Err(SessionError::PeerUnknown) => {
                self.console.line("Peer not yet known. Waiting for handshake...");
                false
            }
            Err(err) => {
                warn!(%err, "failed to encrypt message");
                false
            }
        }
    }
}

impl<O> fmt::Debug for Session<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("socket", &self.socket)
            .finish_non_exhaustive()
    }
}

async fn receive_loop<O: Write>(
    socket: Arc<PeerSocket>,
    state: Arc<RwLock<SessionState>>,
    console: Arc<Console<O>>,
    flag: Arc<RunFlag>,
    received: Arc<AtomicUsize>,
    config: SessionConfig,
) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    while flag.is_running() {
        let result = tokio::select! {
            result = socket.recv_timeout(&mut buf, config.recv_timeout) => result,
            _ = flag.stopped() => break,
        };
        let (len, from) = match result {
            Ok(Some(datagram)) => datagram,
            Ok(None) => continue,
            Err(err) => {
                debug!(%err, "receive failed");
                continue;
            }
        };

        let outcome = state
            .write()
            .await
            .handle_datagram(&buf[..len], from, Instant::now());

        if let Some((frame, to)) = outcome.reply {
            if let Err(err) = socket.send_frame(&frame, to).await {
                debug!(%to, %err, kind = %frame.kind(), "reply send failed");
            }
        }
        match outcome.event {
            Some(SessionEvent::Established { peer }) => console.line(format_args!(
                "Handshake complete with {peer}. Starting encrypted P2P chat."
            )),
            Some(SessionEvent::PeerAcknowledged) => console.line("Handshake acknowledged by peer."),
            Some(SessionEvent::Message(text)) => {
                received.fetch_add(1, Ordering::SeqCst);
                console.line(format_args!("Peer: {text}"));
            }
            None => {}
        }
    }
}

async fn drive_handshake<O: Write>(
    role: Role,
    socket: Arc<PeerSocket>,
    state: Arc<RwLock<SessionState>>,
    console: Arc<Console<O>>,
    flag: Arc<RunFlag>,
    config: SessionConfig,
) {
    let socket = &*socket;
    let state = &*state;
    let outcome = match role {
        Role::Guest => {
            retry_with_deadline(
                config.guest_retry_interval,
                config.guest_deadline,
                &flag,
                move || async move {
                    let Some((hello, host)) = state.read().await.hello() else {
                        return true;
                    };
                    if let Err(err) = socket.send_frame(&hello, host).await {
                        debug!(%host, %err, "handshake send failed");
                    }
                    false
                },
            )
            .await
        }
        Role::Host => {
            retry_with_deadline(
                config.recv_timeout,
                config.host_deadline,
                &flag,
                move || async move { state.read().await.is_established() },
            )
            .await
        }
    };

    if outcome == RetryOutcome::DeadlineElapsed {
        match role {
            Role::Host => {
                console.line("No handshake received within timeout. You can keep waiting or /exit.")
            }
            Role::Guest => console.line("Handshake not acknowledged yet. Continuing punches."),
        }
    }
}

/// Run a session to completion, blocking the calling thread.
///
/// Lines are read from `input` on a dedicated thread; user-facing text goes
/// to `output`. Must not be called from inside a tokio runtime.
pub fn run_session<I, O>(
    selection: RoleSelection,
    env: SessionEnv,
    input: I,
    output: O,
) -> Result<SessionReport, SessionError>
where
    I: BufRead + Send + 'static,
    O: Write + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(SessionError::Runtime)?;

    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("peerlink-input".into())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(SessionError::Runtime)?;

    let report = runtime.block_on(async move {
        let session = Session::open(selection, env, output).await?;
        Ok::<_, SessionError>(session.run(rx).await)
    })?;
    // The input thread may be blocked on a read; it is not joined.
    runtime.shutdown_background();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ClientId, StaticClientId};
    use crate::transport::FixedLookup;
    use std::io::Cursor;
    use std::path::Path;
    use std::time::Duration;

    const CODE: &str = "1234567890123456";

    /// Output sink readable from the test.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }

        async fn wait_for(&self, needle: &str) {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
            while !self.text().contains(needle) {
                assert!(
                    tokio::time::Instant::now() < deadline,
                    "timed out waiting for {needle:?}, output so far:\n{}",
                    self.text()
                );
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn config(dir: &Path, name: &str) -> SessionConfig {
        SessionConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            recv_timeout: Duration::from_millis(50),
            punch_interval: Duration::from_millis(100),
            guest_retry_interval: Duration::from_millis(50),
            failure_threshold: 3,
            cache_path: dir.join(format!("{name}_sessions.json")),
            allow_list_path: dir.join("allowed_clients.json"),
            ..SessionConfig::default()
        }
    }

    fn guest_id() -> ClientId {
        ClientId::new("guest-laptop").unwrap()
    }

    fn host_env(dir: &Path) -> SessionEnv {
        SessionEnv::new(config(dir, "host"))
            .with_ip_lookup(FixedLookup("203.0.113.7".parse().unwrap()))
            .with_allow_list([guest_id()].into_iter().collect())
    }

    fn guest_env(dir: &Path) -> SessionEnv {
        SessionEnv::new(config(dir, "guest"))
            .with_ip_lookup(NoLookup)
            .with_client_ids(StaticClientId(guest_id()))
    }

    #[test]
    fn test_guest_selection_validation() {
        assert!(RoleSelection::guest(CODE, "203.0.113.7", "40000").is_ok());
        assert!(matches!(
            RoleSelection::guest("12345", "203.0.113.7", "40000"),
            Err(SessionError::InvalidSessionCode)
        ));
        for (ip, port) in [("not-an-ip", "40000"), ("203.0.113.7", "0"), ("203.0.113.7", "http"), ("0.0.0.0", "1")] {
            assert!(
                matches!(
                    RoleSelection::guest(CODE, ip, port),
                    Err(SessionError::InvalidHostAddress(_))
                ),
                "{ip}:{port} should be rejected"
            );
        }
        assert_eq!(RoleSelection::host().role(), Role::Host);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_hello_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let host_out = SharedBuf::default();
        let guest_out = SharedBuf::default();

        let code = SessionCode::parse(CODE).unwrap();
        let host = Session::open(
            RoleSelection::host_with_code(code),
            host_env(dir.path()),
            host_out.clone(),
        )
        .await
        .unwrap();
        let port = host.local_addr().unwrap().port().to_string();

        let cached = SessionCache::new(dir.path().join("host_sessions.json")).read().unwrap();
        assert_eq!(cached.map(|e| e.role), Some(Role::Host));

        let selection = RoleSelection::guest(CODE, "127.0.0.1", &port).unwrap();
        let guest = Session::open(selection, guest_env(dir.path()), guest_out.clone())
            .await
            .unwrap();

        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (guest_tx, guest_rx) = mpsc::unbounded_channel();
        let host_task = tokio::spawn(host.run(host_rx));
        let guest_task = tokio::spawn(guest.run(guest_rx));

        guest_out.wait_for("Starting encrypted P2P chat.").await;
        host_out.wait_for("Handshake acknowledged by peer.").await;

        guest_tx.send("hello".to_string()).unwrap();
        host_out.wait_for("Peer: hello").await;

        host_tx.send("hi guest".to_string()).unwrap();
        guest_out.wait_for("Peer: hi guest").await;

        guest_tx.send(EXIT_COMMAND.to_string()).unwrap();
        host_tx.send(EXIT_COMMAND.to_string()).unwrap();
        let guest_report = guest_task.await.unwrap();
        let host_report = host_task.await.unwrap();

        assert_eq!(host_report.messages_received, 1);
        assert_eq!(host_report.messages_sent, 1);
        assert_eq!(guest_report.messages_received, 1);
        assert_eq!(guest_report.peer.map(|p| p.port()), port.parse().ok());

        let host_text = host_out.text();
        assert!(host_text.contains(&format!("Your session code: {CODE}")));
        assert!(host_text.contains("Your public IP: 203.0.113.7"));
        assert!(host_text.contains("Session closed. Cache cleared."));
        assert!(guest_out.text().contains("Your client id: guest-laptop"));

        for name in ["host_sessions.json", "guest_sessions.json"] {
            let raw = std::fs::read_to_string(dir.path().join(name)).unwrap();
            assert_eq!(raw, "{}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wrong_code_gets_banned() {
        let dir = tempfile::tempdir().unwrap();
        let host_out = SharedBuf::default();

        let host = Session::open(
            RoleSelection::host_with_code(SessionCode::parse(CODE).unwrap()),
            host_env(dir.path()),
            host_out.clone(),
        )
        .await
        .unwrap();
        let host_state = host.state();
        let port = host.local_addr().unwrap().port().to_string();

        let selection = RoleSelection::guest("6543210987654321", "127.0.0.1", &port).unwrap();
        let guest = Session::open(selection, guest_env(dir.path()), SharedBuf::default())
            .await
            .unwrap();
        let guest_state = guest.state();

        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (guest_tx, guest_rx) = mpsc::unbounded_channel();
        let host_task = tokio::spawn(host.run(host_rx));
        let guest_task = tokio::spawn(guest.run(guest_rx));

        let loopback: IpAddr = "127.0.0.1".parse().unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let banned = host_state
                .read()
                .await
                .access()
                .is_some_and(|a| a.is_banned(loopback, Instant::now()));
            if banned {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "guest was never banned");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // Keep resending for a while; nothing gets through.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!host_state.read().await.is_established());
        assert!(!guest_state.read().await.is_established());

        guest_tx.send("anyone?".to_string()).unwrap();
        drop(guest_tx);
        drop(host_tx);
        let guest_report = guest_task.await.unwrap();
        let host_report = host_task.await.unwrap();
        assert_eq!(host_report.peer, None);
        assert_eq!(guest_report.messages_sent, 0);
        assert!(!host_out.text().contains("Handshake complete"));
    }

    #[test]
    fn test_run_session_exits_on_command() {
        let dir = tempfile::tempdir().unwrap();
        let out = SharedBuf::default();
        let report = run_session(
            RoleSelection::host(),
            host_env(dir.path()),
            Cursor::new("/exit\n"),
            out.clone(),
        )
        .unwrap();

        assert_eq!(report.role, Role::Host);
        assert_eq!(report.peer, None);
        let text = out.text();
        assert!(text.contains("Waiting for guest handshake packet..."));
        assert!(text.ends_with("Session closed. Cache cleared.\n"));
    }

    #[test]
    fn test_run_session_reports_waiting_peer_then_eof() {
        let dir = tempfile::tempdir().unwrap();
        let out = SharedBuf::default();
        let selection = RoleSelection::guest(CODE, "127.0.0.1", "9").unwrap();
        run_session(selection, guest_env(dir.path()), Cursor::new("too early\n"), out.clone()).unwrap();

        let text = out.text();
        assert!(text.contains("Peer not yet known. Waiting for handshake..."));
        assert!(text.contains("Session closed. Cache cleared."));
    }

    #[test]
    fn test_bind_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let taken = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut config = config(dir.path(), "host");
        config.bind_addr = taken.local_addr().unwrap();

        let result = run_session(
            RoleSelection::host(),
            SessionEnv::new(config).with_ip_lookup(NoLookup),
            Cursor::new(""),
            SharedBuf::default(),
        );
        assert!(matches!(result, Err(SessionError::Bind(_))));
    }
}
