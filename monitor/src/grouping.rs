use std::collections::{HashMap, HashSet};

use claude_monitor_shared::Instance;

use crate::unicode_utils::locale_cmp;

/// cwd が空のインスタンスをまとめるグループキー
pub const UNKNOWN_GROUP_KEY: &str = "unknown";

/// 作業ディレクトリ単位の集計
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceGroup {
    pub key: String,
    /// 元リストでの出現順
    pub members: Vec<Instance>,
    pub total_cpu: f64,
    pub total_mem: f64,
}

impl InstanceGroup {
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

pub fn group_key(instance: &Instance) -> &str {
    if instance.cwd.is_empty() {
        UNKNOWN_GROUP_KEY
    } else {
        &instance.cwd
    }
}

/// インスタンス一覧を cwd ごとにまとめ、キーの辞書順で返す
pub fn group_instances(instances: &[Instance]) -> Vec<InstanceGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut partitions: Vec<(&str, Vec<Instance>)> = Vec::new();

    for instance in instances {
        let key = group_key(instance);
        let slot = *index.entry(key).or_insert_with(|| {
            partitions.push((key, Vec::new()));
            partitions.len() - 1
        });
        partitions[slot].1.push(instance.clone());
    }

    let mut groups: Vec<InstanceGroup> = partitions
        .into_iter()
        .map(|(key, members)| InstanceGroup {
            key: key.to_string(),
            total_cpu: members.iter().map(|m| m.cpu_percent).sum(),
            total_mem: members.iter().map(|m| m.memory_mb).sum(),
            members,
        })
        .collect();

    groups.sort_by(|a, b| locale_cmp(&a.key, &b.key));
    groups
}

/// 展開中のグループ（キーで保持するので並び替えや再集計をまたいで残る）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedGroups {
    keys: HashSet<String>,
}

impl ExpandedGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切り替え後に展開されていれば true
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.keys.remove(key) {
            false
        } else {
            self.keys.insert(key.to_string());
            true
        }
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
