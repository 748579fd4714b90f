// ==========================================
// SMART CALDA - 导入合并引擎
// ==========================================
// 职责: 按自然键幂等合并实体集合（upsert）
// 规则: 已有键保持原位置被覆盖，新键按出现顺序追加，incoming 内同键后写覆盖
// 红线: 每次导入每个集合只调用一次，禁止逐行线性扫描
// ==========================================

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// 合并统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
}

/// 批量 upsert
///
/// # 参数
/// - existing: 现有集合
/// - incoming: 待写入集合
/// - key_of: 自然键提取函数
///
/// # 返回
/// 合并后的集合（existing 顺序在前，新键追加在后）
pub fn upsert_batch<T, K, F>(existing: Vec<T>, incoming: Vec<T>, key_of: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    upsert_batch_with_stats(existing, incoming, key_of).0
}

/// 批量 upsert，同时返回新增/更新计数
pub fn upsert_batch_with_stats<T, K, F>(
    existing: Vec<T>,
    incoming: Vec<T>,
    key_of: F,
) -> (Vec<T>, MergeStats)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::with_capacity(existing.len() + incoming.len());
    let mut merged: Vec<T> = Vec::with_capacity(existing.len() + incoming.len());

    for item in existing {
        let key = key_of(&item);
        match positions.get(&key) {
            // 现有集合内重复键：保留首位，后值覆盖
            Some(&pos) => merged[pos] = item,
            None => {
                positions.insert(key, merged.len());
                merged.push(item);
            }
        }
    }

    let existing_len = merged.len();
    let mut stats = MergeStats::default();
    let mut touched: HashSet<usize> = HashSet::new();

    for item in incoming {
        let key = key_of(&item);
        match positions.get(&key) {
            Some(&pos) => {
                if pos < existing_len && touched.insert(pos) {
                    stats.updated += 1;
                }
                merged[pos] = item;
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(item);
                stats.inserted += 1;
            }
        }
    }

    (merged, stats)
}

/// 单次导入内按首次出现去重（主数据提取用）
#[derive(Debug)]
pub struct FirstSeen<T> {
    seen: HashSet<String>,
    items: Vec<T>,
}

impl<T> FirstSeen<T> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    /// 键为空或已出现时忽略，返回是否收录
    pub fn offer(&mut self, key: &str, build: impl FnOnce() -> T) -> bool {
        if key.is_empty() || self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_string());
        self.items.push(build());
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for FirstSeen<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        value: i32,
    }

    fn item(id: &'static str, value: i32) -> Item {
        Item { id, value }
    }

    #[test]
    fn test_upsert_keeps_order_and_appends() {
        let existing = vec![item("a", 1), item("b", 2)];
        let incoming = vec![item("c", 3), item("a", 10)];
        let (merged, stats) = upsert_batch_with_stats(existing, incoming, |i| i.id);
        assert_eq!(merged, vec![item("a", 10), item("b", 2), item("c", 3)]);
        assert_eq!(stats, MergeStats { inserted: 1, updated: 1 });
    }

    #[test]
    fn test_incoming_duplicates_last_wins() {
        let merged = upsert_batch(vec![], vec![item("x", 1), item("x", 2)], |i| i.id);
        assert_eq!(merged, vec![item("x", 2)]);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let existing = vec![item("a", 1), item("b", 2)];
        let incoming = vec![item("b", 20), item("d", 4)];
        let once = upsert_batch(existing, incoming.clone(), |i| i.id);
        let twice = upsert_batch(once.clone(), incoming, |i| i.id);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_first_seen_dedup() {
        let mut sections = FirstSeen::new();
        assert!(sections.offer("10", || "Seção 10"));
        assert!(!sections.offer("10", || "Outra"));
        assert!(!sections.offer("", || "Vazia"));
        assert!(sections.offer("11", || "Seção 11"));
        assert_eq!(sections.into_vec(), vec!["Seção 10", "Seção 11"]);
    }
}
