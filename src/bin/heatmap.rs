/// 热力图演示 (Heatmap demo)
///
/// 合成若干条横穿画面的跟踪轨迹, 逐帧驱动HeatmapAnnotator,
/// 将标注帧保存为PNG序列并输出计数汇总.
///
/// 运行: cargo run --bin heatmap -- --region "220,90 420,90 420,270 220,270"
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use heatmap_rs::{gen_time_string, BBox, Detection, HeatmapAnnotator, HeatmapConfig};
use heatmap_rs::{Colormap, TrackingResult};

/// 跟踪器预热帧数 (此前不输出跟踪ID, 热力图应原样透传)
const WARMUP_FRAMES: u32 = 2;

/// 热力图演示参数
#[derive(Parser, Debug)]
#[command(author, version, about = "实时热力图演示 - 合成追踪输入", long_about = None)]
struct Args {
    /// 帧宽度
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// 帧高度
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// 处理帧数
    #[arg(long, default_value_t = 150)]
    frames: u32,

    /// 合成目标数量
    #[arg(long, default_value_t = 4)]
    objects: u32,

    /// 伪彩色映射 (jet/turbo/hot/cool)
    #[arg(long, default_value = "jet")]
    colormap: String,

    /// 密度叠加权重 [0,1]
    #[arg(long, default_value_t = 0.5)]
    alpha: f32,

    /// 计数区域顶点 "x,y x,y x,y ..." (不指定则为纯占用模式)
    #[arg(long)]
    region: Option<String>,

    /// 弹出实时显示窗口 (需要display特性)
    #[arg(long, default_value_t = false)]
    view: bool,

    /// 计数标签字体文件 (ttf/otf)
    #[arg(long)]
    font: Option<PathBuf>,

    /// 输出根目录
    #[arg(long, default_value = "runs")]
    output: PathBuf,

    /// 不保存PNG帧序列 (只统计)
    #[arg(long, default_value_t = false)]
    no_save: bool,
}

/// 运行汇总 (写入summary.json)
#[derive(Serialize)]
struct RunSummary {
    frames_processed: u32,
    in_count: u64,
    out_count: u64,
    counted_tracks: usize,
    counting_enabled: bool,
    colormap: String,
}

/// 合成目标: 固定车道上横向移动的矩形
struct SynthObject {
    track_id: u32,
    x: f32,
    y: f32,
    vx: f32,
    w: f32,
    h: f32,
}

impl SynthObject {
    fn step(&mut self, jitter: f32, frame_width: f32) {
        self.x += self.vx + jitter;
        // 移出画面后从另一侧回绕
        if self.vx > 0.0 && self.x > frame_width {
            self.x = -self.w;
        } else if self.vx < 0.0 && self.x + self.w < 0.0 {
            self.x = frame_width;
        }
    }

    fn bbox(&self) -> BBox {
        BBox::new(self.x, self.y, self.x + self.w, self.y + self.h)
    }
}

fn spawn_objects(count: u32, frame_width: f32, frame_height: f32) -> Vec<SynthObject> {
    let w = (frame_width * 0.06).max(8.0);
    let h = (frame_height * 0.18).max(12.0);
    (0..count)
        .map(|i| {
            let lane_y = frame_height * (i + 1) as f32 / (count + 1) as f32 - h / 2.0;
            let leftward = i % 2 == 1;
            let speed = 2.0 + i as f32 * 0.7;
            SynthObject {
                track_id: i + 1,
                x: if leftward { frame_width - w } else { 0.0 },
                y: lane_y,
                vx: if leftward { -speed } else { speed },
                w,
                h,
            }
        })
        .collect()
}

/// 根据ID生成不同颜色 (黄金角度采样)
fn id_to_color(id: u32) -> Rgb<u8> {
    let hue = (id as f32 * 137.508) % 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.8, 0.9);
    Rgb([r, g, b])
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

/// 绘制合成帧: 深色背景 + 各目标的填充矩形
fn render_scene(width: u32, height: u32, objects: &[SynthObject]) -> RgbImage {
    let mut frame = RgbImage::from_pixel(width, height, Rgb([24, 24, 32]));
    for obj in objects {
        let x = obj.x.round() as i32;
        let y = obj.y.round() as i32;
        let rect = Rect::at(x, y).of_size(obj.w as u32, obj.h as u32);
        draw_filled_rect_mut(&mut frame, rect, id_to_color(obj.track_id));
        draw_hollow_rect_mut(&mut frame, rect, Rgb([230, 230, 230]));
    }
    frame
}

fn parse_region(text: &str) -> Result<Vec<(f32, f32)>> {
    let mut points = Vec::new();
    for token in text.split_whitespace() {
        let (x, y) = token
            .split_once(',')
            .with_context(|| format!("bad region point '{token}', expected x,y"))?;
        let x: f32 = x.trim().parse().with_context(|| format!("bad x in '{token}'"))?;
        let y: f32 = y.trim().parse().with_context(|| format!("bad y in '{token}'"))?;
        points.push((x, y));
    }
    Ok(points)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("heatmap=info,heatmap_rs=info")
        .init();

    let args = Args::parse();

    let region_points = match &args.region {
        Some(text) => Some(parse_region(text).context("parse --region")?),
        None => None,
    };

    if args.view && !heatmap_rs::display::interactive_display_available() {
        warn!("interactive display not available in this environment, continuing headless");
    }

    let mut config = HeatmapConfig::new(args.width, args.height);
    config.colormap = Colormap::from_name(&args.colormap)?;
    config.blend_alpha = args.alpha;
    config.display_enabled = args.view;
    config.counting_region_points = region_points;
    config.label_font = args.font.clone();

    let mut annotator = HeatmapAnnotator::new(config)?;

    let out_dir = args.output.join(format!("heatmap_{}", gen_time_string("")));
    if !args.no_save {
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("create output dir {}", out_dir.display()))?;
    }

    println!("🔥 热力图演示启动");
    println!(
        "   分辨率: {}x{} | 帧数: {} | 目标: {} | 调色板: {} | 计数: {}",
        args.width,
        args.height,
        args.frames,
        args.objects,
        args.colormap,
        if annotator.counting_enabled() {
            "启用"
        } else {
            "禁用"
        }
    );

    let mut objects = spawn_objects(args.objects, args.width as f32, args.height as f32);
    let mut rng = rand::thread_rng();
    let mut processed = 0u32;

    for frame_idx in 0..args.frames {
        for obj in objects.iter_mut() {
            obj.step(rng.gen_range(-0.4..0.4), args.width as f32);
        }

        let frame = render_scene(args.width, args.height, &objects);

        // 预热期模拟跟踪器尚未分配ID
        let warmed_up = frame_idx >= WARMUP_FRAMES;
        let tracks = TrackingResult::new(
            objects
                .iter()
                .map(|obj| {
                    Detection::new(obj.bbox(), warmed_up.then_some(obj.track_id))
                })
                .collect(),
        );

        let output = annotator.process(&frame, &tracks)?;
        processed += 1;

        if !args.no_save {
            let path = out_dir.join(format!("frame_{frame_idx:05}.png"));
            output
                .save(&path)
                .with_context(|| format!("save {}", path.display()))?;
        }

        if frame_idx % 30 == 0 {
            info!(
                frame = frame_idx,
                in_count = annotator.in_count(),
                out_count = annotator.out_count(),
                "processing"
            );
        }

        if annotator.quit_requested() {
            info!("quit requested from live view, stopping frame delivery");
            break;
        }
    }

    let summary = RunSummary {
        frames_processed: processed,
        in_count: annotator.in_count(),
        out_count: annotator.out_count(),
        counted_tracks: annotator.counted_tracks(),
        counting_enabled: annotator.counting_enabled(),
        colormap: args.colormap.clone(),
    };

    if !args.no_save {
        let summary_path = out_dir.join("summary.json");
        fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("write {}", summary_path.display()))?;
        println!("📁 输出目录: {}", out_dir.display());
    }

    println!(
        "✅ 处理完成: {}帧 | InCount: {} | OutCount: {} | 轨迹: {}",
        summary.frames_processed,
        summary.in_count,
        summary.out_count,
        summary.counted_tracks
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let points = parse_region("220,90 420,90 420,270 220,270").unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], (220.0, 90.0));
        assert_eq!(points[3], (220.0, 270.0));
    }

    #[test]
    fn test_parse_region_rejects_garbage() {
        assert!(parse_region("220;90 420,90").is_err());
        assert!(parse_region("a,b").is_err());
    }

    #[test]
    fn test_objects_wrap_around() {
        let mut obj = SynthObject {
            track_id: 1,
            x: 635.0,
            y: 10.0,
            vx: 3.0,
            w: 40.0,
            h: 60.0,
        };
        for _ in 0..10 {
            obj.step(0.0, 640.0);
        }
        assert!(obj.x < 640.0);
    }
}
