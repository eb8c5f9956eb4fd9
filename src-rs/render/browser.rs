use super::SceneRenderer;
use crate::config::BROWSER_ENV;
use crate::fsutil::{abs_path, ensure_parent_dir};
use crate::scene::{ObjectFit, Scene};
use crate::shell::command_exists;
use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Lets a headless Chromium lay out the scene as HTML and screenshot it.
pub struct BrowserRenderer {
    binary: String,
    timeout: Duration,
}

impl BrowserRenderer {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn resolve(override_bin: Option<&str>, timeout: Duration) -> Result<Self> {
        let binary = resolve_browser_executable(override_bin).ok_or_else(|| {
            anyhow!("no headless browser found; pass --browser or set {BROWSER_ENV}")
        })?;
        Ok(Self::new(binary, timeout))
    }
}

impl SceneRenderer for BrowserRenderer {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn render(&self, scene: &Scene, viewport: (u32, u32), out: &Path) -> Result<()> {
        ensure_parent_dir(out)?;
        let page = ScratchFile(out.with_extension("frame.html"));
        fs::write(&page.0, scene_to_html(scene))
            .with_context(|| format!("failed to write scene page: {}", page.0.display()))?;

        // Chromium can be chatty on stderr; a file never fills up and blocks it.
        let stderr_log = ScratchFile(out.with_extension("frame.log"));
        let log_file = File::create(&stderr_log.0)
            .with_context(|| format!("failed to create browser log: {}", stderr_log.0.display()))?;

        let mut cmd = self.command(&page.0, out, viewport);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::from(log_file));

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to launch browser: {}", self.binary))?;
        let Some(status) = child.wait_timeout(self.timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            bail!(
                "browser did not finish rendering within {}s",
                self.timeout.as_secs_f64()
            );
        };

        if !status.success() {
            let stderr = fs::read(&stderr_log.0)
                .map(|raw| String::from_utf8_lossy(&raw).into_owned())
                .unwrap_or_default();
            bail!(
                "browser exited with status {}: {}",
                status.code().unwrap_or(1),
                tail_text(stderr.trim(), 1200)
            );
        }
        log::debug!("browser render finished: {}", out.display());
        Ok(())
    }
}

impl BrowserRenderer {
    fn command(&self, page: &Path, out: &Path, viewport: (u32, u32)) -> Command {
        let (width, height) = viewport;
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg("--no-first-run")
            .arg("--force-device-scale-factor=1")
            // Lets the page settle (image decode, layout) before the capture.
            .arg("--virtual-time-budget=5000")
            .arg(format!("--window-size={width},{height}"))
            .arg(format!("--screenshot={}", abs_path(out).display()))
            // A plain path, not a file:// URL: `#`, `%` and `?` stay literal.
            .arg(abs_path(page));
        cmd
    }
}

/// Scene as a standalone HTML page with the screenshot inlined.
pub fn scene_to_html(scene: &Scene) -> String {
    let root = &scene.root;
    let rounded = &root.child;
    let element = &rounded.child;
    let gradient = format!(
        "linear-gradient({}deg, {}, {})",
        root.gradient.angle_deg,
        root.gradient.from.hex(),
        root.gradient.to.hex()
    );
    let fit = match element.fit {
        ObjectFit::Contain => "contain",
    };
    let data_uri = format!(
        "data:{};base64,{}",
        element.source.mime(),
        STANDARD.encode(element.source.encoded())
    );

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  * {{ margin: 0; padding: 0; }}
  body, html {{ width: 100%; height: 100%; overflow: hidden; }}
  .center {{ display: flex; justify-content: center; align-items: center; }}
</style>
</head>
<body>
<div class="center" style="width: {rw}px; height: {rh}px; background-image: {gradient};">
  <div class="center" style="width: {bw}px; height: {bh}px; border-radius: {radius}px; background-color: {fill}; overflow: hidden;">
    <img style="width: {iw}px; height: {ih}px; object-fit: {fit}; border: none;" src="{data_uri}" />
  </div>
</div>
</body>
</html>
"#,
        rw = root.size.0,
        rh = root.size.1,
        bw = rounded.size.0,
        bh = rounded.size.1,
        radius = rounded.radius,
        fill = rounded.fill.css(),
        iw = element.size.0,
        ih = element.size.1,
    )
}

fn resolve_browser_executable(override_bin: Option<&str>) -> Option<String> {
    let from_env = env::var(BROWSER_ENV).ok();
    for bin in [override_bin, from_env.as_deref()].into_iter().flatten() {
        let trimmed = bin.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    BROWSER_CANDIDATES
        .iter()
        .find(|candidate| {
            if candidate.starts_with('/') {
                Path::new(candidate).exists()
            } else {
                command_exists(candidate)
            }
        })
        .map(|candidate| candidate.to_string())
}

/// Last `limit` characters of `text`; errors usually end the output.
fn tail_text(text: &str, limit: usize) -> String {
    let count = text.chars().count();
    if count <= limit {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - limit).collect();
    format!("...<truncated>...\n{tail}")
}

/// Removed on drop, on success and failure alike.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::config::Gradient;
    use crate::layout::compute_layout;
    use crate::scene::compose_scene;
    use crate::source::SourceImage;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn scene_in(dir: &Path) -> Scene {
        let path = dir.join("shot.png");
        RgbaImage::from_pixel(60, 40, Rgba([5, 5, 5, 255]))
            .save(&path)
            .unwrap();
        let source = SourceImage::load(&path).unwrap();
        let geometry = compute_layout(60, 40, 2.0 / 3.0, 0.1, 0.1);
        compose_scene(&geometry, Rgb::new(30, 30, 30), &source, &Gradient::default())
    }

    #[test]
    fn html_carries_every_box() {
        let dir = tempdir().unwrap();
        let scene = scene_in(dir.path());
        let html = scene_to_html(&scene);

        assert!(html.contains("width: 100px; height: 67px;"));
        assert!(html.contains("linear-gradient(45deg, #0069a3, #00bb8a)"));
        assert!(html.contains("background-color: rgb(30,30,30)"));
        assert!(html.contains("border-radius: 20"));
        assert!(html.contains("width: 60px; height: 40px; object-fit: contain;"));
        assert!(html.contains("src=\"data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn missing_browser_fails_and_cleans_up() {
        let dir = tempdir().unwrap();
        let scene = scene_in(dir.path());
        let out = dir.path().join("framed.png");
        let renderer =
            BrowserRenderer::new("snapframe-no-such-browser", Duration::from_secs(5));

        let err = renderer.render(&scene, scene.viewport(), &out).unwrap_err();
        assert!(err.to_string().contains("failed to launch browser"));
        assert!(!dir.path().join("framed.frame.html").exists());
        assert!(!dir.path().join("framed.frame.log").exists());
    }

    #[test]
    fn explicit_browser_wins() {
        assert_eq!(
            resolve_browser_executable(Some("  /opt/chrome  ")),
            Some("/opt/chrome".to_string())
        );
    }

    #[test]
    fn keeps_the_end_of_long_output() {
        assert_eq!(tail_text("abc", 5), "abc");
        assert_eq!(tail_text("abcdef", 3), "...<truncated>...\ndef");
    }

    #[test]
    fn page_is_passed_as_a_plain_path() {
        let renderer = BrowserRenderer::new("chromium", Duration::from_secs(5));
        let page = Path::new("/tmp/frames #1/50%?/snap.frame.html");
        let cmd = renderer.command(page, Path::new("/tmp/frames #1/50%?/snap.png"), (100, 67));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(args.last().map(String::as_str), Some("/tmp/frames #1/50%?/snap.frame.html"));
        assert!(args.contains(&"--window-size=100,67".to_string()));
        assert!(args.contains(&"--screenshot=/tmp/frames #1/50%?/snap.png".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("file://")));
    }

    #[cfg(unix)]
    #[test]
    fn noisy_browser_failure_reports_exit_status() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let scene = scene_in(dir.path());
        let fake = dir.path().join("fake-browser");
        fs::write(
            &fake,
            "#!/bin/sh\nhead -c 200000 /dev/zero | tr '\\0' x >&2\necho 'GPU process crashed' >&2\nexit 3\n",
        )
        .unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();
        let out = dir.path().join("framed.png");
        let renderer = BrowserRenderer::new(fake.display().to_string(), Duration::from_secs(20));

        let err = renderer.render(&scene, scene.viewport(), &out).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("browser exited with status 3"), "{message}");
        assert!(message.ends_with("GPU process crashed"), "{message}");
        assert!(!dir.path().join("framed.frame.log").exists());
        assert!(!dir.path().join("framed.frame.html").exists());
    }
}
