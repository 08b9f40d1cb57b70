// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 实时热力图模块 (Real-time heatmap)
//!
//! 消费上游跟踪输出, 累积空间占用密度, 对用户定义的多边形区域
//! 做方向性进出计数, 并将伪彩色密度叠加合成到原始视频帧上.
//!
//! 每帧处理流程:
//! 提取检测框/跟踪ID → 更新密度图与轨迹历史 → (可选)区域计数 →
//! 归一化+伪彩色 → 与原帧加权合成 → (可选)实时显示 → 返回合成帧

pub mod colormap;
pub mod region;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use image::{Rgb, RgbImage};
use ndarray::{s, Array2};
use tracing::{debug, warn};

use crate::annotator::Annotator;
use crate::display::{ViewEvent, ViewWindow};
use crate::types::{BBox, TrackPoint, TrackingResult};
use self::colormap::Colormap;
use self::region::CountingRegion;

/// 每条轨迹保留的最近中心点数量 (滑动窗口, 先进先出)
pub const TRACK_HISTORY_LEN: usize = 30;

// ========== 配置 ==========

/// 热力图配置 (流开始前设置一次, 构造标注器时校验)
#[derive(Clone, Debug)]
pub struct HeatmapConfig {
    /// 帧宽度 (像素)
    pub frame_width: u32,
    /// 帧高度 (像素)
    pub frame_height: u32,
    /// 伪彩色调色板
    pub colormap: Colormap,
    /// 密度叠加权重 [0,1] (原帧权重为 1-alpha)
    pub blend_alpha: f32,
    /// 是否请求实时显示窗口
    pub display_enabled: bool,
    /// 计数区域顶点 (≥3个点启用进出计数, None为纯占用模式)
    pub counting_region_points: Option<Vec<(f32, f32)>>,
    /// 区域轮廓颜色
    pub region_color: Rgb<u8>,
    /// 区域轮廓线宽
    pub region_thickness: u32,
    /// 计数标签笔画粗细
    pub label_thickness: u32,
    /// 标签字体文件 (ttf/otf, 缺失时不绘制标签)
    pub label_font: Option<PathBuf>,
}

impl HeatmapConfig {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            colormap: Colormap::Jet,
            blend_alpha: 0.5,
            display_enabled: false,
            counting_region_points: None,
            region_color: Rgb([255, 0, 255]),
            region_thickness: 5,
            label_thickness: 2,
            label_font: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            bail!(
                "frame dimensions must be positive, got {}x{}",
                self.frame_width,
                self.frame_height
            );
        }
        if !(0.0..=1.0).contains(&self.blend_alpha) {
            bail!("blend_alpha must be within [0, 1], got {}", self.blend_alpha);
        }
        if self.region_thickness == 0 {
            bail!("region_thickness must be at least 1");
        }
        if self.label_thickness == 0 {
            bail!("label_thickness must be at least 1");
        }
        Ok(())
    }
}

// ========== 热力图标注器 ==========

/// 热力图标注器
///
/// 持有全部累积状态: 密度图、轨迹历史、计数器与渲染参数.
/// 模式在构造时固定: 纯占用 (无区域) 或 占用+计数 (有区域),
/// 生命周期内不切换. 唯一的状态变更入口是[`process`](Self::process).
pub struct HeatmapAnnotator {
    width: u32,
    height: u32,
    colormap: Colormap,
    blend_alpha: f32,

    /// 占用密度累积 (形状: 高×宽, 运行期间只增不减)
    density: Array2<f32>,

    /// 轨迹中心点历史 (仅计数模式维护; 轨迹总数随流增长, 不淘汰)
    track_history: HashMap<u32, Vec<TrackPoint>>,

    region: Option<CountingRegion>,
    /// 已计数的跟踪ID (防止同一轨迹重复计数)
    counted: HashSet<u32>,
    in_count: u64,
    out_count: u64,

    annotator: Annotator,
    region_color: Rgb<u8>,
    region_thickness: u32,
    label_thickness: u32,

    /// 显示能力在构造时探测一次, 之后不变
    view: Option<ViewWindow>,
    quit_requested: bool,
}

impl HeatmapAnnotator {
    pub fn new(config: HeatmapConfig) -> Result<Self> {
        config.validate()?;

        let region = match &config.counting_region_points {
            Some(points) => Some(
                CountingRegion::new(points.clone()).context("invalid counting region")?,
            ),
            None => None,
        };

        let view = if config.display_enabled {
            match ViewWindow::open() {
                Ok(view) => Some(view),
                Err(err) => {
                    warn!("interactive display unavailable, continuing without it: {err:#}");
                    None
                }
            }
        } else {
            None
        };

        let annotator = Annotator::new(config.label_font.as_deref());
        if region.is_some() && !annotator.has_font() {
            debug!("no label font configured, in/out counts will not be drawn");
        }

        Ok(Self {
            width: config.frame_width,
            height: config.frame_height,
            colormap: config.colormap,
            blend_alpha: config.blend_alpha,
            density: Array2::zeros((config.frame_height as usize, config.frame_width as usize)),
            track_history: HashMap::new(),
            region,
            counted: HashSet::new(),
            in_count: 0,
            out_count: 0,
            annotator,
            region_color: config.region_color,
            region_thickness: config.region_thickness,
            label_thickness: config.label_thickness,
            view,
            quit_requested: false,
        })
    }

    /// 处理一帧: 更新累积状态并返回合成帧
    ///
    /// 本帧不携带任何跟踪ID时 (跟踪器尚未稳定或无检测),
    /// 不做任何处理, 原样返回输入帧
    pub fn process(&mut self, frame: &RgbImage, tracks: &TrackingResult) -> Result<RgbImage> {
        if frame.width() != self.width || frame.height() != self.height {
            bail!(
                "frame size {}x{} does not match configured {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            );
        }

        if !tracks.has_track_ids() {
            return Ok(frame.clone());
        }

        for det in &tracks.detections {
            let Some(track_id) = det.track_id else {
                continue;
            };
            self.accumulate(&det.bbox);
            self.update_counting(track_id, &det.bbox);
        }

        let output = self.render(frame);

        if let Some(view) = self.view.as_mut() {
            match view.show(&output) {
                Ok(ViewEvent::QuitRequested) => self.quit_requested = true,
                Ok(ViewEvent::None) => {}
                Err(err) => warn!("live view failed: {err:#}"),
            }
        }

        Ok(output)
    }

    /// 检测框矩形足迹内的所有密度单元 +1
    ///
    /// 边界按整数截断, 上界开区间, 越界部分裁剪到帧内
    fn accumulate(&mut self, bbox: &BBox) {
        let (h, w) = (self.height as usize, self.width as usize);
        let y0 = (bbox.y1 as usize).min(h);
        let y1 = (bbox.y2 as usize).min(h);
        let x0 = (bbox.x1 as usize).min(w);
        let x1 = (bbox.x2 as usize).min(w);
        if y0 >= y1 || x0 >= x1 {
            return;
        }
        let mut cells = self.density.slice_mut(s![y0..y1, x0..x1]);
        cells += 1.0;
    }

    /// 追加轨迹历史并评估区域穿越
    ///
    /// 方向规则: 检测框左边缘x小于区域质心x计出, 否则计入
    /// (静态质心启发式, 非速度方向计算)
    fn update_counting(&mut self, track_id: u32, bbox: &BBox) {
        let Self {
            region,
            track_history,
            counted,
            in_count,
            out_count,
            ..
        } = self;
        let Some(region) = region.as_ref() else {
            return;
        };

        let (cx, cy) = bbox.center();
        let history = track_history.entry(track_id).or_default();
        history.push(TrackPoint { x: cx, y: cy });
        if history.len() > TRACK_HISTORY_LEN {
            history.remove(0);
        }

        let latest = history[history.len() - 1];
        if region.contains(latest.x, latest.y) && counted.insert(track_id) {
            if bbox.x1 < region.centroid().0 {
                *out_count += 1;
            } else {
                *in_count += 1;
            }
        }
    }

    /// 归一化密度 → 伪彩色 → 与原帧(含区域标注)加权合成
    fn render(&self, frame: &RgbImage) -> RgbImage {
        let mut base = frame.clone();
        if let Some(region) = &self.region {
            self.annotator
                .draw_region(&mut base, region, self.region_color, self.region_thickness);
            self.annotator
                .count_labels(&mut base, self.in_count, self.out_count, self.label_thickness);
        }

        let overlay = self.colorize();
        blend(&base, &overlay, self.blend_alpha)
    }

    /// 当前累积值min-max归一化到[0,255]后查调色板
    fn colorize(&self) -> RgbImage {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in self.density.iter() {
            min = min.min(v);
            max = max.max(v);
        }
        let range = max - min;

        RgbImage::from_fn(self.width, self.height, |x, y| {
            let v = self.density[[y as usize, x as usize]];
            let norm = if range > 0.0 {
                ((v - min) * 255.0 / range).round() as u8
            } else {
                0
            };
            self.colormap.map(norm)
        })
    }

    // ========== 只读访问 ==========

    pub fn in_count(&self) -> u64 {
        self.in_count
    }

    pub fn out_count(&self) -> u64 {
        self.out_count
    }

    /// 已计数的不同轨迹数量
    pub fn counted_tracks(&self) -> usize {
        self.counted.len()
    }

    pub fn density(&self) -> &Array2<f32> {
        &self.density
    }

    pub fn counting_enabled(&self) -> bool {
        self.region.is_some()
    }

    pub fn track_history(&self, track_id: u32) -> Option<&[TrackPoint]> {
        self.track_history.get(&track_id).map(|h| h.as_slice())
    }

    /// 用户是否在显示窗口请求退出 (由外层循环决定是否停止喂帧)
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

/// 逐像素加权合成: out = base*(1-alpha) + overlay*alpha
fn blend(base: &RgbImage, overlay: &RgbImage, alpha: f32) -> RgbImage {
    RgbImage::from_fn(base.width(), base.height(), |x, y| {
        let a = base.get_pixel(x, y);
        let b = overlay.get_pixel(x, y);
        Rgb([
            mix(a[0], b[0], alpha),
            mix(a[1], b[1], alpha),
            mix(a[2], b[2], alpha),
        ])
    })
}

fn mix(a: u8, b: u8, alpha: f32) -> u8 {
    (a as f32 * (1.0 - alpha) + b as f32 * alpha)
        .round()
        .clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Detection;

    fn frame(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([7, 7, 7]))
    }

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, track_id: Option<u32>) -> Detection {
        Detection::new(BBox::new(x1, y1, x2, y2), track_id)
    }

    fn square_region() -> Vec<(f32, f32)> {
        // 以(50,50)为中心的正方形
        vec![(30.0, 30.0), (70.0, 30.0), (70.0, 70.0), (30.0, 70.0)]
    }

    fn counting_annotator() -> HeatmapAnnotator {
        let mut config = HeatmapConfig::new(100, 100);
        config.counting_region_points = Some(square_region());
        HeatmapAnnotator::new(config).unwrap()
    }

    #[test]
    fn test_config_rejects_zero_dimensions() {
        assert!(HeatmapAnnotator::new(HeatmapConfig::new(0, 100)).is_err());
        assert!(HeatmapAnnotator::new(HeatmapConfig::new(100, 0)).is_err());
    }

    #[test]
    fn test_config_rejects_alpha_out_of_range() {
        let mut config = HeatmapConfig::new(100, 100);
        config.blend_alpha = 1.5;
        assert!(HeatmapAnnotator::new(config).is_err());

        let mut config = HeatmapConfig::new(100, 100);
        config.blend_alpha = -0.1;
        assert!(HeatmapAnnotator::new(config).is_err());
    }

    #[test]
    fn test_config_rejects_degenerate_region() {
        let mut config = HeatmapConfig::new(100, 100);
        config.counting_region_points = Some(vec![(0.0, 0.0), (10.0, 10.0)]);
        assert!(HeatmapAnnotator::new(config).is_err());
    }

    #[test]
    fn test_config_rejects_zero_thickness() {
        let mut config = HeatmapConfig::new(100, 100);
        config.region_thickness = 0;
        assert!(HeatmapAnnotator::new(config).is_err());
    }

    #[test]
    fn test_untracked_frame_is_passthrough() {
        let mut annotator = HeatmapAnnotator::new(HeatmapConfig::new(100, 100)).unwrap();
        let input = frame(100, 100);

        let tracks = TrackingResult::new(vec![det(10.0, 10.0, 20.0, 20.0, None)]);
        let output = annotator.process(&input, &tracks).unwrap();

        assert_eq!(output.as_raw(), input.as_raw());
        assert_eq!(annotator.density().sum(), 0.0);

        // 完全无检测同样透传
        let output = annotator.process(&input, &TrackingResult::default()).unwrap();
        assert_eq!(output.as_raw(), input.as_raw());
    }

    #[test]
    fn test_density_accumulates_box_footprint() {
        let mut annotator = HeatmapAnnotator::new(HeatmapConfig::new(100, 100)).unwrap();
        let input = frame(100, 100);
        let tracks = TrackingResult::new(vec![det(10.0, 10.0, 20.0, 20.0, Some(1))]);

        for _ in 0..5 {
            let output = annotator.process(&input, &tracks).unwrap();
            assert_eq!(output.dimensions(), (100, 100));
        }

        let density = annotator.density();
        assert_eq!(density[[15, 15]], 5.0);
        assert_eq!(density[[10, 10]], 5.0);
        assert_eq!(density[[19, 19]], 5.0);
        // 足迹外保持为0 (上界开区间)
        assert_eq!(density[[20, 20]], 0.0);
        assert_eq!(density[[9, 9]], 0.0);
        assert_eq!(density.sum(), 5.0 * 100.0);
    }

    #[test]
    fn test_out_of_frame_box_is_clipped() {
        let mut annotator = HeatmapAnnotator::new(HeatmapConfig::new(100, 100)).unwrap();
        let input = frame(100, 100);
        let tracks = TrackingResult::new(vec![det(-10.0, 90.0, 10.0, 120.0, Some(1))]);
        annotator.process(&input, &tracks).unwrap();

        // 裁剪后足迹为 x 0..10, y 90..100
        assert_eq!(annotator.density().sum(), 100.0);
        assert_eq!(annotator.density()[[95, 5]], 1.0);
    }

    #[test]
    fn test_track_history_bounded() {
        let mut annotator = counting_annotator();
        let input = frame(100, 100);
        let tracks = TrackingResult::new(vec![det(40.0, 40.0, 60.0, 60.0, Some(1))]);

        for _ in 0..100 {
            annotator.process(&input, &tracks).unwrap();
        }

        assert_eq!(annotator.track_history(1).unwrap().len(), TRACK_HISTORY_LEN);
    }

    #[test]
    fn test_counting_is_idempotent_per_track() {
        let mut annotator = counting_annotator();
        let input = frame(100, 100);
        // 中心(50,50)在区域内, 此后每帧都停留在区域内
        let tracks = TrackingResult::new(vec![det(40.0, 40.0, 60.0, 60.0, Some(7))]);

        for _ in 0..20 {
            annotator.process(&input, &tracks).unwrap();
        }

        assert_eq!(annotator.in_count() + annotator.out_count(), 1);
        assert_eq!(annotator.counted_tracks(), 1);
    }

    #[test]
    fn test_left_of_centroid_counts_out() {
        let mut annotator = counting_annotator();
        let input = frame(100, 100);
        // 中心(37.5,50)在区域内, 左边缘30 < 质心x=50
        let tracks = TrackingResult::new(vec![det(30.0, 40.0, 45.0, 60.0, Some(1))]);
        annotator.process(&input, &tracks).unwrap();

        assert_eq!(annotator.out_count(), 1);
        assert_eq!(annotator.in_count(), 0);
    }

    #[test]
    fn test_right_of_centroid_counts_in() {
        let mut annotator = counting_annotator();
        let input = frame(100, 100);
        // 中心(60,50)在区域内, 左边缘55 ≥ 质心x=50
        let tracks = TrackingResult::new(vec![det(55.0, 40.0, 65.0, 60.0, Some(2))]);
        annotator.process(&input, &tracks).unwrap();

        assert_eq!(annotator.in_count(), 1);
        assert_eq!(annotator.out_count(), 0);
    }

    #[test]
    fn test_track_outside_region_not_counted() {
        let mut annotator = counting_annotator();
        let input = frame(100, 100);
        // 中心(15,15)在区域外
        let tracks = TrackingResult::new(vec![det(10.0, 10.0, 20.0, 20.0, Some(3))]);

        for _ in 0..10 {
            annotator.process(&input, &tracks).unwrap();
        }

        assert_eq!(annotator.in_count(), 0);
        assert_eq!(annotator.out_count(), 0);
        assert_eq!(annotator.counted_tracks(), 0);
        // 轨迹历史照常维护
        assert_eq!(annotator.track_history(3).unwrap().len(), 10);
    }

    #[test]
    fn test_occupancy_mode_keeps_no_history() {
        let mut annotator = HeatmapAnnotator::new(HeatmapConfig::new(100, 100)).unwrap();
        assert!(!annotator.counting_enabled());
        let input = frame(100, 100);
        let tracks = TrackingResult::new(vec![det(10.0, 10.0, 20.0, 20.0, Some(1))]);
        annotator.process(&input, &tracks).unwrap();

        assert!(annotator.track_history(1).is_none());
    }

    #[test]
    fn test_full_alpha_overlay_is_pure_colormap() {
        let mut config = HeatmapConfig::new(100, 100);
        config.blend_alpha = 1.0;
        let mut annotator = HeatmapAnnotator::new(config).unwrap();
        let input = frame(100, 100);
        let tracks = TrackingResult::new(vec![det(10.0, 10.0, 20.0, 20.0, Some(1))]);
        let output = annotator.process(&input, &tracks).unwrap();

        // 框内归一化为255, 框外为0
        assert_eq!(*output.get_pixel(15, 15), Colormap::Jet.map(255));
        assert_eq!(*output.get_pixel(50, 50), Colormap::Jet.map(0));
    }

    #[test]
    fn test_zero_alpha_output_equals_input() {
        let mut config = HeatmapConfig::new(100, 100);
        config.blend_alpha = 0.0;
        let mut annotator = HeatmapAnnotator::new(config).unwrap();
        let input = frame(100, 100);
        let tracks = TrackingResult::new(vec![det(10.0, 10.0, 20.0, 20.0, Some(1))]);
        let output = annotator.process(&input, &tracks).unwrap();

        assert_eq!(output.as_raw(), input.as_raw());
    }

    #[test]
    fn test_flat_density_normalizes_without_panic() {
        let mut annotator = HeatmapAnnotator::new(HeatmapConfig::new(50, 50)).unwrap();
        let input = frame(50, 50);
        // 覆盖整帧 → 所有单元相等 → min==max
        let tracks = TrackingResult::new(vec![det(0.0, 0.0, 50.0, 50.0, Some(1))]);
        let output = annotator.process(&input, &tracks).unwrap();
        assert_eq!(output.dimensions(), (50, 50));
    }

    #[test]
    fn test_frame_size_mismatch_rejected() {
        let mut annotator = HeatmapAnnotator::new(HeatmapConfig::new(100, 100)).unwrap();
        let input = frame(64, 64);
        let err = annotator.process(&input, &TrackingResult::default());
        assert!(err.is_err());
    }
}
