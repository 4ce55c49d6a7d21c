/// Bump a statistics counter: `stat!(name)` adds one, `stat!(name, val)`
/// adds `val`.
///
/// Expands to nothing when the `stats` feature is disabled; the value
/// expression is then never evaluated.
#[macro_export]
macro_rules! stat {
    ($counter:ident) => {
        $crate::stat!($counter, 1u64);
    };
    ($counter:ident, $val:expr) => {
        #[cfg(feature = "stats")]
        {
            $crate::stats::STATS
                .$counter
                .fetch_add($val as u64, ::core::sync::atomic::Ordering::Relaxed);
        }
    };
}
