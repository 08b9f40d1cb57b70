//! 追踪数据结构定义
//! Data structures exchanged with the upstream detector/tracker

// ========== 数据结构 ==========

/// 检测框 (Detection bounding box, 像素坐标)
#[derive(Clone, Debug, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence: 1.0,
            class_id: 0,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// 获取中心点
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// 跟踪点 (轨迹中心点)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPoint {
    pub x: f32,
    pub y: f32,
}

/// 单帧中的一个检测 (带可选跟踪ID)
///
/// `track_id`为`None`表示上游跟踪器尚未为该检测分配持久ID
#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: BBox,
    pub track_id: Option<u32>,
}

impl Detection {
    pub fn new(bbox: BBox, track_id: Option<u32>) -> Self {
        Self { bbox, track_id }
    }
}

/// 一帧的跟踪结果 (上游跟踪器 → 热力图模块)
#[derive(Clone, Debug, Default)]
pub struct TrackingResult {
    pub detections: Vec<Detection>,
}

impl TrackingResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// 本帧是否携带任何跟踪ID (无ID时热力图直接透传)
    pub fn has_track_ids(&self) -> bool {
        self.detections.iter().any(|d| d.track_id.is_some())
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}
