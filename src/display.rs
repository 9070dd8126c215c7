use opencv::{core, highgui};

use crate::error::Error;

pub const WINDOW_TITLE: &str = "Object Detection and People Counting";

/// Live preview surface plus the quit-key poll that goes with it.
pub trait Display {
    fn show(&mut self, frame: &core::Mat) -> Result<(), Error>;

    /// Non-blocking check whether the user asked to stop.
    fn quit_requested(&mut self) -> Result<bool, Error>;

    fn close(&mut self) -> Result<(), Error>;
}

impl<V: Display + ?Sized> Display for Box<V> {
    fn show(&mut self, frame: &core::Mat) -> Result<(), Error> {
        (**self).show(frame)
    }

    fn quit_requested(&mut self) -> Result<bool, Error> {
        (**self).quit_requested()
    }

    fn close(&mut self) -> Result<(), Error> {
        (**self).close()
    }
}

/// HighGUI window; `q` quits.
pub struct Window {
    title: String,
    open: bool,
    quit_key: u8,
    poll_ms: i32,
}

impl Window {
    pub fn new<S: ToString>(title: S) -> Result<Self, Error> {
        let title = title.to_string();
        highgui::named_window(&title, highgui::WINDOW_AUTOSIZE)?;

        Ok(Self {
            title,
            open: true,
            quit_key: b'q',
            poll_ms: 1,
        })
    }
}

impl Display for Window {
    fn show(&mut self, frame: &core::Mat) -> Result<(), Error> {
        highgui::imshow(&self.title, frame)?;
        Ok(())
    }

    fn quit_requested(&mut self) -> Result<bool, Error> {
        let key = highgui::wait_key(self.poll_ms)?;
        Ok(key >= 0 && key & 0xFF == self.quit_key as i32)
    }

    fn close(&mut self) -> Result<(), Error> {
        if self.open {
            self.open = false;
            highgui::destroy_window(&self.title)?;
        }
        Ok(())
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::error!("closing window {:?}: {}", self.title, err);
        }
    }
}

/// No window, never asks to quit.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Display for Headless {
    #[inline]
    fn show(&mut self, _frame: &core::Mat) -> Result<(), Error> {
        Ok(())
    }

    #[inline]
    fn quit_requested(&mut self) -> Result<bool, Error> {
        Ok(false)
    }

    #[inline]
    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Window when `enabled`, headless otherwise.
pub fn open(enabled: bool) -> Result<Box<dyn Display>, Error> {
    if enabled {
        Ok(Box::new(Window::new(WINDOW_TITLE)?))
    } else {
        log::info!("display disabled, running headless");
        Ok(Box::new(Headless))
    }
}
