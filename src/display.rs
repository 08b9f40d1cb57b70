//! 实时显示窗口 (Live view window)
//! 可选交互显示侧通道: 配置时探测能力, 每帧轮询退出按键
//!
//! 编译时未启用`display`特性或运行环境无显示能力时静默降级,
//! 占用统计与计数处理不受影响

use anyhow::Result;
use image::RgbImage;

/// 固定窗口标题
pub const WINDOW_TITLE: &str = "Ultralytics Heatmap";

/// 退出按键
pub const QUIT_KEY: char = 'q';

/// 每帧显示轮询结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    None,
    /// 用户按下退出键 (仅上报给调用方, 不中断帧处理)
    QuitRequested,
}

/// 当前环境是否支持交互显示
pub fn interactive_display_available() -> bool {
    backend::probe()
}

/// 实时显示窗口句柄
pub struct ViewWindow {
    inner: backend::Window,
}

impl ViewWindow {
    /// 打开显示窗口 (配置阶段调用一次, 失败即本次运行无显示)
    pub fn open() -> Result<Self> {
        Ok(Self {
            inner: backend::Window::open()?,
        })
    }

    /// 显示一帧并轮询按键
    pub fn show(&mut self, frame: &RgbImage) -> Result<ViewEvent> {
        self.inner.show(frame)
    }
}

#[cfg(feature = "display")]
mod backend {
    use anyhow::{Context, Result};
    use image::RgbImage;
    use opencv::core::{AlgorithmHint, Mat};
    use opencv::{highgui, imgproc, prelude::*};

    use super::{ViewEvent, QUIT_KEY, WINDOW_TITLE};

    pub fn probe() -> bool {
        // 无X11/Wayland会话时HighGUI必然失败, 提前短路
        #[cfg(target_os = "linux")]
        if std::env::var_os("DISPLAY").is_none() && std::env::var_os("WAYLAND_DISPLAY").is_none()
        {
            return false;
        }
        highgui::named_window(WINDOW_TITLE, highgui::WINDOW_AUTOSIZE).is_ok()
    }

    pub struct Window;

    impl Window {
        pub fn open() -> Result<Self> {
            if !probe() {
                anyhow::bail!("no interactive display surface available");
            }
            Ok(Self)
        }

        pub fn show(&mut self, frame: &RgbImage) -> Result<ViewEvent> {
            let rows = frame.height() as i32;
            let flat = Mat::from_slice(frame.as_raw()).context("wrap frame buffer")?;
            let rgb = flat.reshape(3, rows).context("reshape frame buffer")?;
            let mut bgr = Mat::default();
            imgproc::cvt_color(
                &rgb,
                &mut bgr,
                imgproc::COLOR_RGB2BGR,
                0,
                AlgorithmHint::ALGO_HINT_DEFAULT,
            )?;
            highgui::imshow(WINDOW_TITLE, &bgr)?;
            let key = highgui::wait_key(1)?;
            if key == QUIT_KEY as i32 {
                return Ok(ViewEvent::QuitRequested);
            }
            Ok(ViewEvent::None)
        }
    }
}

#[cfg(not(feature = "display"))]
mod backend {
    use anyhow::{bail, Result};
    use image::RgbImage;

    use super::ViewEvent;

    pub fn probe() -> bool {
        false
    }

    pub struct Window;

    impl Window {
        pub fn open() -> Result<Self> {
            bail!("built without the 'display' feature");
        }

        pub fn show(&mut self, _frame: &RgbImage) -> Result<ViewEvent> {
            Ok(ViewEvent::None)
        }
    }
}
