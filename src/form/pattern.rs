use crate::core::{Result, SchemaError};
use lru::LruCache;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const PATTERN_CACHE_CAPACITY: usize = 200;

lazy_static::lazy_static! {
    /// Process-wide, shared by every validator
    static ref PATTERN_CACHE: Arc<Mutex<LruCache<String, Arc<Regex>>>> =
        Arc::new(Mutex::new(LruCache::new(NonZeroUsize::new(PATTERN_CACHE_CAPACITY).unwrap())));
}

/// Compile a `pattern` prop as a whole-value match, reusing cached regexes.
pub fn compile_pattern(pattern: &str) -> Result<Arc<Regex>> {
    let mut cache = PATTERN_CACHE.lock()?;

    if let Some(regex) = cache.get(pattern) {
        return Ok(Arc::clone(regex));
    }

    let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
        SchemaError::InvalidConfiguration(format!("Invalid pattern '{}': {}", pattern, e))
    })?;
    let regex = Arc::new(regex);
    cache.put(pattern.to_string(), Arc::clone(&regex));

    Ok(regex)
}
