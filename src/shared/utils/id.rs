use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// ミリ秒時刻をもとに単調増加するIDを生成する
///
/// 同一ミリ秒内で複数回呼ばれた場合や時計が巻き戻った場合でも、
/// 直前の値より必ず大きい値を返す。
#[derive(Debug, Default)]
pub struct MonotonicIdGenerator {
    last: AtomicI64,
}

impl MonotonicIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次のIDを生成する
    pub fn next_id(&self) -> String {
        self.next_value(Utc::now().timestamp_millis()).to_string()
    }

    fn next_value(&self, now_millis: i64) -> i64 {
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_millis.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_next_id_is_numeric_millis() {
        let generator = MonotonicIdGenerator::new();
        let before = Utc::now().timestamp_millis();
        let id: i64 = generator.next_id().parse().unwrap();
        assert!(id >= before);
    }

    #[test]
    fn test_same_millisecond_still_increases() {
        let generator = MonotonicIdGenerator::new();
        assert_eq!(generator.next_value(1_000), 1_000);
        assert_eq!(generator.next_value(1_000), 1_001);
        assert_eq!(generator.next_value(1_000), 1_002);
    }

    #[test]
    fn test_clock_going_backwards_still_increases() {
        let generator = MonotonicIdGenerator::new();
        assert_eq!(generator.next_value(5_000), 5_000);
        assert_eq!(generator.next_value(4_000), 5_001);
    }

    #[test]
    fn test_ids_are_unique() {
        let generator = MonotonicIdGenerator::new();
        let ids: HashSet<String> = (0..1_000).map(|_| generator.next_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }
}
