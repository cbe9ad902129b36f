//! In-process cache store
//!
//! `MemoryStore` honours the same contract as the Redis store: passive TTL
//! expiry, glob `SCAN` with opaque cursors, bulk delete. It also exposes an
//! availability switch and an operation counter, so callers can run without
//! Redis and observe exactly when the store is touched.

use crate::errors::CacheError;
use crate::store::{CacheStore, ScanPage, StoreInfo};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Open scan cursors kept per store; the oldest is evicted past this
const MAX_OPEN_CURSORS: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    /// Scan cursor id -> last key examined. Ids grow, so the first is the oldest.
    cursors: BTreeMap<u64, String>,
    next_cursor: u64,
    connected: bool,
}

/// Key/value store kept in process memory
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    available: AtomicBool,
    operations: AtomicU64,
    started: Instant,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            available: AtomicBool::new(true),
            operations: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Simulate the backend becoming reachable or unreachable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of store calls attempted so far, failed ones included
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    /// Write a key without TTL, bypassing the availability switch
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.with_state(|state| {
            state.entries.insert(
                key.into(),
                Entry {
                    value: value.into(),
                    expires_at: None,
                },
            );
        });
    }

    /// Read a live key, bypassing the availability switch
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.with_state(|state| {
            state
                .entries
                .get(key)
                .filter(|entry| entry.is_live(now))
                .map(|entry| entry.value.clone())
        })
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.with_state(|state| state.entries.values().filter(|e| e.is_live(now)).count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }

    /// Count the call and fail it when the backend is marked unreachable
    fn begin(&self) -> Result<(), CacheError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.is_available() {
            Ok(())
        } else {
            Err(CacheError::Unavailable("memory store marked unavailable".into()))
        }
    }

    fn begin_connected(&self) -> Result<(), CacheError> {
        self.begin()?;
        if self.with_state(|state| state.connected) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("memory store not connected".into()))
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn connect(&self) -> Result<(), CacheError> {
        self.begin()?;
        self.with_state(|state| state.connected = true);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CacheError> {
        self.with_state(|state| {
            state.connected = false;
            state.cursors.clear();
        });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.begin_connected()?;
        let now = Instant::now();
        Ok(self.with_state(|state| match state.entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        self.begin_connected()?;
        let expires_at = Instant::now().checked_add(Duration::from_secs(ttl_seconds));
        self.with_state(|state| {
            state.entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at,
                },
            );
        });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.begin_connected()?;
        Ok(self.with_state(|state| state.entries.remove(key).is_some()))
    }

    async fn scan(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, CacheError> {
        self.begin_connected()?;
        let now = Instant::now();

        Ok(self.with_state(|state| {
            let start = if cursor == 0 {
                Bound::Unbounded
            } else {
                match state.cursors.remove(&cursor) {
                    Some(last) => Bound::Excluded(last),
                    // Unknown cursor: nothing left to report.
                    None => return ScanPage::default(),
                }
            };

            let mut examined = state
                .entries
                .range::<String, _>((start, Bound::Unbounded))
                .take(count.max(1) + 1);

            let mut keys = Vec::new();
            let mut last_examined = None;
            for (key, entry) in examined.by_ref().take(count.max(1)) {
                if entry.is_live(now) && glob_match(pattern, key) {
                    keys.push(key.clone());
                }
                last_examined = Some(key.clone());
            }
            let has_more = examined.next().is_some();

            let next = match (has_more, last_examined) {
                (true, Some(last)) => {
                    state.next_cursor += 1;
                    let id = state.next_cursor;
                    state.cursors.insert(id, last);
                    while state.cursors.len() > MAX_OPEN_CURSORS {
                        state.cursors.pop_first();
                    }
                    id
                }
                _ => 0,
            };

            ScanPage { cursor: next, keys }
        }))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.begin_connected()?;
        Ok(self.with_state(|state| {
            keys.iter()
                .filter(|key| state.entries.remove(key.as_str()).is_some())
                .count() as u64
        }))
    }

    async fn info(&self) -> Result<StoreInfo, CacheError> {
        self.begin_connected()?;
        let bytes: usize = self.with_state(|state| {
            state
                .entries
                .iter()
                .map(|(key, entry)| key.len() + entry.value.len())
                .sum()
        });

        Ok(StoreInfo {
            memory_used: format_bytes(bytes),
            connected_clients: 1,
            uptime_days: self.started.elapsed().as_secs() / 86_400,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => Token::AnyRun,
            '?' => Token::AnyChar,
            // A trailing backslash matches itself, as in Redis.
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        });
    }
    tokens
}

/// Glob match supporting `*` (any run), `?` (any single char) and `\` escapes
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = tokenize(pattern);
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(Token::AnyChar) => {
                p += 1;
                t += 1;
            }
            Some(Token::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            Some(Token::AnyRun) => {
                star = Some((p, t));
                p += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|token| *token == Token::AnyRun)
}

fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "K", "M", "G"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{}{}", bytes, UNITS[0])
    } else {
        format!("{:.2}{}", value, UNITS[unit])
    }
}
