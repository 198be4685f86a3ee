//! # chrome-locate
//!
//! Find a Chrome/Chromium executable so that `headless_chrome` can launch a
//! browser without the user hand-configuring paths.
//!
//! ## How it works
//!
//! [`locate_chrome`] walks the following sources, first match wins:
//!
//! 1. `CHROME_PATH`: explicit override; must point to an existing file.
//! 2. Well-known system install locations for the current platform.
//! 3. Every directory on `PATH`, probing the usual binary names
//!    (`google-chrome`, `chromium`, `chromium-browser`, …).
//! 4. Browser downloads cached by Puppeteer (`~/.cache/puppeteer`) and
//!    Playwright (`~/.cache/ms-playwright`).
//!
//! The result is memoised for the lifetime of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! let chrome = chrome_locate::locate_chrome().expect("no Chrome/Chromium found");
//! println!("using {}", chrome.display());
//! ```
//!
//! ## Environment variable overrides
//!
//! - `CHROME_PATH`: path to an existing Chrome/Chromium executable.
//! - `CHROME_LOCATE_CACHE_DIR`: override the directory scanned for
//!   Puppeteer/Playwright downloads (defaults to the user cache dir).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable holding an explicit browser path.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

/// Environment variable overriding the download-cache root.
pub const CACHE_DIR_ENV: &str = "CHROME_LOCATE_CACHE_DIR";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chrome-locate.
#[derive(Error, Debug)]
pub enum ChromeLocateError {
    /// `CHROME_PATH` was set but does not name an existing file.
    #[error("CHROME_PATH '{path}' does not exist")]
    OverrideMissing { path: PathBuf },

    /// No candidate matched.
    #[error(
        "No Chrome/Chromium executable found (searched {searched} locations).\n\
Install Chrome or Chromium, or set CHROME_PATH=/path/to/chrome."
    )]
    NotFound { searched: usize },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

fn system_candidates() -> &'static [&'static str] {
    match std::env::consts::OS {
        "macos" => &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ],
        "windows" => &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ],
        _ => &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ],
    }
}

fn binary_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["chrome.exe", "msedge.exe"]
    } else {
        &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "chrome",
            "headless_shell",
        ]
    }
}

/// Relative path of the executable inside one Puppeteer/Playwright build dir.
fn cached_build_layouts() -> &'static [&'static str] {
    match std::env::consts::OS {
        "macos" => &[
            "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-mac/Chromium.app/Contents/MacOS/Chromium",
        ],
        "windows" => &["chrome-win64/chrome.exe", "chrome-win/chrome.exe"],
        _ => &["chrome-linux64/chrome", "chrome-linux/chrome"],
    }
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Root under which Puppeteer and Playwright keep downloaded browsers.
///
/// Override by setting `CHROME_LOCATE_CACHE_DIR`.
pub fn browser_cache_root() -> PathBuf {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Locate a browser executable using the process environment.
///
/// Safe to call from many threads; after the first success the answer is
/// served from memory.
pub fn locate_chrome() -> Result<PathBuf, ChromeLocateError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = locate_with(
        std::env::var_os(CHROME_PATH_ENV),
        std::env::var_os("PATH"),
        &browser_cache_root(),
    )?;

    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Locate a browser executable from explicit inputs.
///
/// `override_path` plays the role of `CHROME_PATH`, `path_var` the role of
/// `PATH`. An override that does not exist is an error rather than a silent
/// fall-through, so a typo never picks up some other browser.
pub fn locate_with(
    override_path: Option<OsString>,
    path_var: Option<OsString>,
    cache_root: &Path,
) -> Result<PathBuf, ChromeLocateError> {
    // 1. Environment variable override.
    if let Some(p) = override_path.filter(|p| !p.is_empty()) {
        let p = PathBuf::from(p);
        if p.is_file() {
            return Ok(p);
        }
        return Err(ChromeLocateError::OverrideMissing { path: p });
    }

    let mut searched = 0usize;

    // 2. System installs.
    for candidate in system_candidates() {
        searched += 1;
        let p = Path::new(candidate);
        if p.is_file() {
            return Ok(p.to_path_buf());
        }
    }

    // 3. PATH lookup.
    if let Some(path_var) = path_var {
        for dir in std::env::split_paths(&path_var) {
            for name in binary_names() {
                searched += 1;
                let p = dir.join(name);
                if p.is_file() {
                    return Ok(p);
                }
            }
        }
    }

    // 4. Puppeteer / Playwright downloads.
    if let Some(found) = scan_download_cache(cache_root, &mut searched).into_iter().next() {
        return Ok(found);
    }

    Err(ChromeLocateError::NotFound { searched })
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Yields cached browser executables, newest build directory first.
fn scan_download_cache(root: &Path, searched: &mut usize) -> Vec<PathBuf> {
    let roots = [
        root.join("puppeteer").join("chrome"),
        root.join("puppeteer").join("chrome-headless-shell"),
        root.join("ms-playwright"),
    ];

    let mut found = Vec::new();
    for base in roots {
        let Ok(entries) = std::fs::read_dir(&base) else {
            continue;
        };
        let mut builds: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        // Build dirs embed a version (`linux-131.0.6778.85`, `chromium-1148`);
        // reverse lexical order is good enough to prefer newer builds.
        builds.sort();
        builds.reverse();

        for build in builds {
            for layout in cached_build_layouts() {
                *searched += 1;
                let p = build.join(layout);
                if p.is_file() {
                    found.push(p);
                }
            }
        }
    }
    found
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"#!/bin/sh\n").unwrap();
    }

    #[test]
    fn override_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("my-chrome");
        touch(&exe);

        let got = locate_with(Some(exe.clone().into_os_string()), None, dir.path()).unwrap();
        assert_eq!(got, exe);
    }

    #[test]
    fn missing_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("nope");

        let err = locate_with(Some(exe.clone().into_os_string()), None, dir.path()).unwrap_err();
        assert!(matches!(err, ChromeLocateError::OverrideMissing { ref path } if *path == exe));
    }

    #[test]
    fn empty_override_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        touch(&bin.join(binary_names()[0]));

        let got = locate_with(
            Some(OsString::new()),
            Some(bin.clone().into_os_string()),
            dir.path(),
        );
        // A system install may shadow the PATH entry on developer machines.
        assert!(got.is_ok());
    }

    #[test]
    fn puppeteer_cache_is_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let layout = cached_build_layouts()[0];
        let exe = dir
            .path()
            .join("puppeteer/chrome/linux-131.0.6778.85")
            .join(layout);
        touch(&exe);

        let mut searched = 0;
        let found = scan_download_cache(dir.path(), &mut searched);
        assert_eq!(found, vec![exe]);
        assert!(searched > 0);
    }

    #[test]
    fn newer_cached_build_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let layout = cached_build_layouts()[0];
        let old = dir.path().join("ms-playwright/chromium-1100").join(layout);
        let new = dir.path().join("ms-playwright/chromium-1148").join(layout);
        touch(&old);
        touch(&new);

        let mut searched = 0;
        let found = scan_download_cache(dir.path(), &mut searched);
        assert_eq!(found.first(), Some(&new));
    }

    #[test]
    fn not_found_reports_search_count() {
        let err = ChromeLocateError::NotFound { searched: 12 };
        assert!(err.to_string().contains("12 locations"));
        assert!(err.to_string().contains("CHROME_PATH"));
    }
}
