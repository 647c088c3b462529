use chrono::{DateTime, Local, Utc};

use crate::grouping::{group_instances, ExpandedGroups, InstanceGroup};
use crate::registry::RegistrySnapshot;
use crate::unicode_utils::truncate_str;

/// コマンドラインの最大表示幅
pub const CMDLINE_DISPLAY_WIDTH: usize = 60;

/// 監視ビューの描画モデル
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardModel {
    /// 未インストール（未確認を含む）。インスタンスは表示しない
    NotInstalled,
    Empty {
        loading: bool,
    },
    Groups {
        loading: bool,
        instance_count: usize,
        groups: Vec<GroupRow>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: String,
    pub count: usize,
    pub total_cpu: f64,
    pub total_mem: f64,
    pub expanded: bool,
    pub members: Vec<InstanceRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRow {
    pub id: String,
    pub pid: u32,
    pub cmdline: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub started: String,
}

impl DashboardModel {
    pub fn build(snapshot: &RegistrySnapshot, expanded: &ExpandedGroups) -> Self {
        if !snapshot.gate.monitoring_available() {
            return DashboardModel::NotInstalled;
        }
        if snapshot.instances.is_empty() {
            return DashboardModel::Empty {
                loading: snapshot.loading,
            };
        }

        let groups = group_instances(&snapshot.instances)
            .into_iter()
            .map(|group| GroupRow::from_group(group, expanded))
            .collect();

        DashboardModel::Groups {
            loading: snapshot.loading,
            instance_count: snapshot.instances.len(),
            groups,
        }
    }

    /// 表示中のグループ（1始まりの番号で指定）
    pub fn group(&self, number: usize) -> Option<&GroupRow> {
        match self {
            DashboardModel::Groups { groups, .. } => groups.get(number.checked_sub(1)?),
            _ => None,
        }
    }
}

impl GroupRow {
    fn from_group(group: InstanceGroup, expanded: &ExpandedGroups) -> Self {
        Self {
            expanded: expanded.is_expanded(&group.key),
            count: group.count(),
            total_cpu: group.total_cpu,
            total_mem: group.total_mem,
            members: group
                .members
                .into_iter()
                .map(|instance| InstanceRow {
                    cmdline: truncate_str(&instance.cmdline, CMDLINE_DISPLAY_WIDTH),
                    started: format_local_time(instance.start_time),
                    id: instance.id,
                    pid: instance.pid,
                    cpu_percent: instance.cpu_percent,
                    memory_mb: instance.memory_mb,
                })
                .collect(),
            key: group.key,
        }
    }
}

fn format_local_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M:%S").to_string()
}
