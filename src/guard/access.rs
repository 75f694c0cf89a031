//! Handshake access control.
//!
//! A handshake is admitted only when its source IP is not banned, its client
//! identifier is on the allow list, and its session token matches the
//! host's. Each refused attempt counts against the source IP; enough of them
//! earn a temporary ban.

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::{MAX_BAN_DURATION, MAX_BAN_ENTRIES, Rejection, StoreError};
use crate::crypto::SessionToken;
use crate::identity::ClientId;

/// Ban length used when the configured one would overflow the clock.
const BAN_FALLBACK: Duration = Duration::from_secs(60 * 60);

/// Set of client identifiers allowed to join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ids: BTreeSet<ClientId>,
}

impl AllowList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of identifiers. A missing file is an empty list.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no allow list file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        let ids: BTreeSet<ClientId> = serde_json::from_str(&data)?;
        Ok(Self { ids })
    }

    /// Write the list as a JSON array, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.ids)?)?;
        Ok(())
    }

    /// Add an identifier. Returns false if it was already present.
    pub fn insert(&mut self, id: ClientId) -> bool {
        self.ids.insert(id)
    }

    /// Check membership.
    pub fn contains(&self, id: &ClientId) -> bool {
        self.ids.contains(id)
    }

    /// Number of identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<ClientId> for AllowList {
    fn from_iter<T: IntoIterator<Item = ClientId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BanEntry {
    failures: u32,
    last_failure: Instant,
    ban_until: Option<Instant>,
}

impl BanEntry {
    /// Still banned, or holding failures younger than `window`.
    fn is_live(&self, now: Instant, window: Duration) -> bool {
        self.is_banned(now)
            || (self.failures > 0 && now.saturating_duration_since(self.last_failure) < window)
    }

    fn is_banned(&self, now: Instant) -> bool {
        self.ban_until.is_some_and(|until| now < until)
    }
}

/// Per-IP failure counters and ban deadlines.
///
/// Entries are forgotten once their ban has expired and their failures are
/// older than the ban duration. At most [`MAX_BAN_ENTRIES`] sources are
/// tracked; when full, the stalest unbanned entry makes room.
#[derive(Debug, Clone)]
pub struct BanTable {
    threshold: u32,
    duration: Duration,
    entries: HashMap<IpAddr, BanEntry>,
}

impl BanTable {
    /// Create a table banning after `threshold` failures for `duration`.
    ///
    /// `duration` is capped at [`MAX_BAN_DURATION`].
    pub fn new(threshold: u32, duration: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            duration: duration.min(MAX_BAN_DURATION),
            entries: HashMap::new(),
        }
    }

    /// Whether `ip` is banned at `now`. Expired bans read as not banned.
    pub fn is_banned(&self, ip: IpAddr, now: Instant) -> bool {
        self.entries.get(&ip).is_some_and(|e| e.is_banned(now))
    }

    /// Count one failure. Returns true if this failure triggered a ban.
    ///
    /// Triggering a ban resets the counter, so the next ban needs another
    /// full run of failures after this one expires.
    pub fn record_failure(&mut self, ip: IpAddr, now: Instant) -> bool {
        if !self.entries.contains_key(&ip) && !self.make_room(now) {
            warn!(%ip, "ban table full of active bans, not tracking source");
            return false;
        }
        let entry = self.entries.entry(ip).or_insert(BanEntry {
            failures: 0,
            last_failure: now,
            ban_until: None,
        });
        entry.failures = entry.failures.saturating_add(1);
        entry.last_failure = now;
        if entry.failures < self.threshold {
            return false;
        }
        entry.failures = 0;
        // Saturate at the far end rather than overflow the clock.
        entry.ban_until = Some(
            now.checked_add(self.duration)
                .or_else(|| now.checked_add(BAN_FALLBACK))
                .unwrap_or(now),
        );
        warn!(%ip, ban_secs = self.duration.as_secs(), "banning source after repeated handshake failures");
        true
    }

    /// Prune dead entries, then evict the stalest unbanned one if still full.
    fn make_room(&mut self, now: Instant) -> bool {
        let window = self.duration;
        self.entries.retain(|_, entry| entry.is_live(now, window));
        if self.entries.len() < MAX_BAN_ENTRIES {
            return true;
        }
        let stalest = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_banned(now))
            .min_by_key(|(_, entry)| entry.last_failure)
            .map(|(ip, _)| *ip);
        match stalest {
            Some(ip) => {
                debug!(%ip, "ban table full, evicting stalest source");
                self.entries.remove(&ip);
                true
            }
            None => false,
        }
    }

    /// Number of tracked sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no source is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Failures counted since the last ban.
    pub fn failures(&self, ip: IpAddr) -> u32 {
        self.entries.get(&ip).map_or(0, |e| e.failures)
    }

    /// End of the latest ban still tracked, expired or not.
    pub fn ban_until(&self, ip: IpAddr) -> Option<Instant> {
        self.entries.get(&ip).and_then(|e| e.ban_until)
    }
}

/// Allow list, local token, and ban table of a host session.
#[derive(Debug, Clone)]
pub struct AccessControl {
    allow_list: AllowList,
    token: SessionToken,
    bans: BanTable,
}

impl AccessControl {
    /// Create access control for one session.
    pub fn new(allow_list: AllowList, token: SessionToken, bans: BanTable) -> Self {
        Self {
            allow_list,
            token,
            bans,
        }
    }

    /// Decide on a handshake attempt.
    ///
    /// Refusals other than [`Rejection::Banned`] are counted against `ip`.
    pub fn check_handshake(
        &mut self,
        ip: IpAddr,
        client_id: &ClientId,
        token: &SessionToken,
        now: Instant,
    ) -> Result<(), Rejection> {
        if self.bans.is_banned(ip, now) {
            return Err(Rejection::Banned);
        }
        let verdict = if !self.allow_list.contains(client_id) {
            Err(Rejection::UnknownClient)
        } else if !self.token.matches(token) {
            Err(Rejection::TokenMismatch)
        } else {
            Ok(())
        };
        if let Err(reason) = verdict {
            debug!(%ip, %client_id, %reason, "handshake refused");
            self.bans.record_failure(ip, now);
        }
        verdict
    }

    /// Count a failure that happened after the checks passed.
    pub fn record_failure(&mut self, ip: IpAddr, now: Instant) -> bool {
        self.bans.record_failure(ip, now)
    }

    /// Whether `ip` is banned at `now`.
    pub fn is_banned(&self, ip: IpAddr, now: Instant) -> bool {
        self.bans.is_banned(ip, now)
    }

    /// The ban table.
    pub fn bans(&self) -> &BanTable {
        &self.bans
    }

    /// The allow list.
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SessionCode;

    const IP: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(203, 0, 113, 9));

    fn guest() -> ClientId {
        ClientId::new("guest-laptop").unwrap()
    }

    fn token(code: &str) -> SessionToken {
        SessionCode::parse(code).unwrap().token()
    }

    fn access() -> AccessControl {
        AccessControl::new(
            [guest()].into_iter().collect(),
            token("1234567890123456"),
            BanTable::new(3, Duration::from_secs(300)),
        )
    }

    #[test]
    fn test_valid_handshake_admitted() {
        let mut access = access();
        let now = Instant::now();
        assert_eq!(
            access.check_handshake(IP, &guest(), &token("1234567890123456"), now),
            Ok(())
        );
        assert_eq!(access.bans().failures(IP), 0);
    }

    #[test]
    fn test_unknown_client_counts() {
        let mut access = access();
        let stranger = ClientId::new("stranger").unwrap();
        assert_eq!(
            access.check_handshake(IP, &stranger, &token("1234567890123456"), Instant::now()),
            Err(Rejection::UnknownClient)
        );
        assert_eq!(access.bans().failures(IP), 1);
    }

    #[test]
    fn test_wrong_token_counts() {
        let mut access = access();
        assert_eq!(
            access.check_handshake(IP, &guest(), &token("6543210987654321"), Instant::now()),
            Err(Rejection::TokenMismatch)
        );
        assert_eq!(access.bans().failures(IP), 1);
    }

    #[test]
    fn test_ban_after_threshold_then_expiry() {
        let mut access = access();
        let wrong = token("0000000000000000");
        let now = Instant::now();

        for _ in 0..3 {
            assert!(access.check_handshake(IP, &guest(), &wrong, now).is_err());
        }
        assert!(access.is_banned(IP, now));
        assert_eq!(access.bans().failures(IP), 0);

        // Banned attempts are refused without counting, even with a good token.
        assert_eq!(
            access.check_handshake(IP, &guest(), &token("1234567890123456"), now),
            Err(Rejection::Banned)
        );
        assert_eq!(access.bans().failures(IP), 0);

        let later = now + Duration::from_secs(301);
        assert!(!access.is_banned(IP, later));
        assert_eq!(
            access.check_handshake(IP, &guest(), &token("1234567890123456"), later),
            Ok(())
        );
    }

    #[test]
    fn test_ban_is_per_ip() {
        let mut bans = BanTable::new(1, Duration::from_secs(60));
        let now = Instant::now();
        let other: IpAddr = "198.51.100.1".parse().unwrap();

        assert!(bans.record_failure(IP, now));
        assert!(bans.is_banned(IP, now));
        assert!(!bans.is_banned(other, now));
        assert_eq!(bans.ban_until(IP), Some(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_ban_duration_is_capped() {
        let mut bans = BanTable::new(1, Duration::from_secs(u64::MAX));
        let now = Instant::now();

        assert!(bans.record_failure(IP, now));
        assert!(bans.is_banned(IP, now + MAX_BAN_DURATION - Duration::from_secs(1)));
        assert!(!bans.is_banned(IP, now + MAX_BAN_DURATION));
    }

    #[test]
    fn test_stale_entries_are_pruned() {
        let mut bans = BanTable::new(3, Duration::from_secs(60));
        let now = Instant::now();
        let other: IpAddr = "198.51.100.1".parse().unwrap();

        bans.record_failure(IP, now);
        assert_eq!(bans.len(), 1);

        // IP's lone failure has aged out by the time another source fails.
        let later = now + Duration::from_secs(61);
        bans.record_failure(other, later);
        assert_eq!(bans.len(), 1);
        assert_eq!(bans.failures(IP), 0);
        assert_eq!(bans.failures(other), 1);
    }

    #[test]
    fn test_active_bans_survive_pruning() {
        let mut bans = BanTable::new(1, Duration::from_secs(60));
        let now = Instant::now();
        let other: IpAddr = "198.51.100.1".parse().unwrap();

        assert!(bans.record_failure(IP, now));
        bans.record_failure(other, now + Duration::from_secs(30));
        assert!(bans.is_banned(IP, now + Duration::from_secs(30)));
        assert_eq!(bans.len(), 2);
    }

    #[test]
    fn test_table_stays_bounded() {
        let mut bans = BanTable::new(3, Duration::from_secs(300));
        let now = Instant::now();

        for n in 0..(MAX_BAN_ENTRIES as u32 + 100) {
            let ip = IpAddr::V4(std::net::Ipv4Addr::from(0x0a00_0000 + n));
            bans.record_failure(ip, now);
        }
        assert_eq!(bans.len(), MAX_BAN_ENTRIES);

        // The newest source still gets tracked.
        let newest = IpAddr::V4(std::net::Ipv4Addr::from(0x0a00_0000 + MAX_BAN_ENTRIES as u32 + 99));
        assert_eq!(bans.failures(newest), 1);
    }

    #[test]
    fn test_allow_list_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("allowed_clients.json");

        assert!(AllowList::load(&path).unwrap().is_empty());

        let mut list = AllowList::new();
        assert!(list.insert(guest()));
        assert!(!list.insert(guest()));
        list.save(&path).unwrap();

        let raw: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, vec!["guest-laptop".to_string()]);
        assert_eq!(AllowList::load(&path).unwrap(), list);
    }

    #[test]
    fn test_allow_list_rejects_invalid_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowed.json");
        std::fs::write(&path, r#"["ok", "not ok"]"#).unwrap();
        assert!(matches!(AllowList::load(&path), Err(StoreError::Json(_))));
    }
}
