// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod annotator; // 区域轮廓与计数标签绘制
pub mod display; // 实时显示窗口
pub mod heatmap; // 热力图核心
pub mod types; // 追踪数据结构

pub use crate::heatmap::colormap::Colormap;
pub use crate::heatmap::region::CountingRegion;
pub use crate::heatmap::{HeatmapAnnotator, HeatmapConfig, TRACK_HISTORY_LEN};
pub use crate::types::{BBox, Detection, TrackPoint, TrackingResult};

/// 本地时间戳字符串 (用于输出目录命名)
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
