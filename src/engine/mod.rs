// ==========================================
// SMART CALDA - 引擎层
// ==========================================
// 职责: 分车、对账、聚合、分类、合并、指标、日报
// 红线: Engine 不拼 SQL，不依赖存储实现
// ==========================================

pub mod aggregator;
pub mod classification;
pub mod daily_report;
pub mod merge;
pub mod metrics;
pub mod partitioner;
pub mod reconciler;

// 重导出核心引擎
pub use aggregator::{GroupTotals, OperationAggregator, OsGroup};
pub use classification::{ClassificationEngine, ClassifiedGroup, DEFAULT_COMPLETION_THRESHOLD};
pub use daily_report::{DailyReport, DailyReportEngine, DailyReportEntry, NameDirectory};
pub use merge::{upsert_batch, upsert_batch_with_stats, FirstSeen, MergeStats};
pub use metrics::{CountEntry, LiquidTotals, MetricsAggregator, SupervisorSeries};
pub use partitioner::{PartitionError, VolumePartitioner};
pub use reconciler::{SecondaryRecord, StatusIndex, TankMetadata, TripStatusReconciler};
