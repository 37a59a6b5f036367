//! 设备时间戳校验

/// 校验设备上报的 UNIX 时间戳。
pub trait TimeVerifier: Send + Sync {
    /// 时间戳有效返回 true。
    fn verify(&self, timestamp: i64) -> bool;
}

/// 基本校验：时间戳必须大于 0。
#[derive(Debug, Default)]
pub struct BasicTimeVerifier;

impl TimeVerifier for BasicTimeVerifier {
    fn verify(&self, timestamp: i64) -> bool {
        timestamp > 0
    }
}

/// 偏差校验：时间戳大于 0 且与参考时间的偏差不超过 max_drift 秒。
pub struct DriftTimeVerifier<F>
where
    F: Fn() -> i64 + Send + Sync,
{
    local_now: F,
    max_drift: i64,
}

impl<F> DriftTimeVerifier<F>
where
    F: Fn() -> i64 + Send + Sync,
{
    pub fn new(local_now: F, max_drift: i64) -> Self {
        Self {
            local_now,
            max_drift,
        }
    }
}

impl<F> TimeVerifier for DriftTimeVerifier<F>
where
    F: Fn() -> i64 + Send + Sync,
{
    fn verify(&self, timestamp: i64) -> bool {
        if timestamp <= 0 {
            return false;
        }

        ((self.local_now)() - timestamp).abs() <= self.max_drift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_rejects_unset_clock() {
        let verifier = BasicTimeVerifier;
        assert!(!verifier.verify(-1));
        assert!(!verifier.verify(0));
        assert!(verifier.verify(1));
    }

    #[test]
    fn drift_bounds_the_difference() {
        let verifier = DriftTimeVerifier::new(|| 100, 10);
        assert!(verifier.verify(95));
        assert!(verifier.verify(110));
        assert!(!verifier.verify(80));
        assert!(!verifier.verify(-1));
    }
}
