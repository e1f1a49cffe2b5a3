//! Browser automation module
//!
//! This module provides browser control through ChromiumOxide: lifecycle
//! management, navigation, network capture, and the [`PageDriver`] seam the
//! crawler is written against.

pub mod controller;
pub mod driver;
pub mod navigation;
pub mod network;

pub use controller::{BrowserConfig, BrowserController, PageHandle};
pub use driver::{CdpDriver, PageDriver};
pub use navigation::{NavigationOptions, NavigationResult, PageNavigator, WaitUntil};
pub use network::NetworkCapture;
