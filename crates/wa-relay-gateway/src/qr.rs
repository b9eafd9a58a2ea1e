//! Pairing-code rendering.
//!
//! Pairing codes are rendered as 400x400 PNG images with a two-module quiet
//! zone, either served raw or embedded in an HTML page as a data URL.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageBuffer, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

/// Side of the rendered image, in pixels.
pub const IMAGE_SIZE: u32 = 400;

/// Quiet zone around the code, in modules.
pub const QUIET_ZONE: u32 = 2;

/// File name offered for the rendered image.
pub const FILE_NAME: &str = "whatsapp-qr.png";

/// Errors raised while rendering a pairing code.
#[derive(Debug, Error)]
pub enum QrError {
    /// The payload does not fit in a QR code.
    #[error("QR generation failed: {0}")]
    Encode(String),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Png(String),
}

impl From<QrError> for crate::error::ApiError {
    fn from(err: QrError) -> Self {
        tracing::error!(error = %err, "Failed to render pairing code");
        Self::Internal(err.to_string())
    }
}

/// Render `payload` as PNG bytes.
///
/// # Errors
///
/// Returns an error if the payload cannot be encoded or the PNG cannot be written.
#[allow(clippy::cast_possible_truncation)]
pub fn render_png(payload: &str) -> Result<Vec<u8>, QrError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| QrError::Encode(e.to_string()))?;

    let modules = code.width() as u32;
    let span = modules + QUIET_ZONE * 2;

    let img = ImageBuffer::from_fn(IMAGE_SIZE, IMAGE_SIZE, |x, y| {
        // Scale pixel coordinates onto the module grid, quiet zone included
        let cx = x * span / IMAGE_SIZE;
        let cy = y * span / IMAGE_SIZE;

        if cx < QUIET_ZONE
            || cy < QUIET_ZONE
            || cx - QUIET_ZONE >= modules
            || cy - QUIET_ZONE >= modules
        {
            return Luma([255u8]);
        }

        match code[((cx - QUIET_ZONE) as usize, (cy - QUIET_ZONE) as usize)] {
            Color::Dark => Luma([0u8]),
            Color::Light => Luma([255u8]),
        }
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| QrError::Png(e.to_string()))?;

    Ok(buf.into_inner())
}

/// Render `payload` as a `data:image/png;base64,...` URL.
///
/// # Errors
///
/// Returns an error if rendering fails.
pub fn render_data_url(payload: &str) -> Result<String, QrError> {
    let png = render_png(payload)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

const PAGE_STYLE: &str = r"
      body {
        font-family: Arial, sans-serif;
        display: flex;
        justify-content: center;
        align-items: center;
        min-height: 100vh;
        margin: 0;
        padding: 20px;
        box-sizing: border-box;
        background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
      }
      .container {
        text-align: center;
        background: white;
        padding: 40px;
        border-radius: 20px;
        box-shadow: 0 10px 40px rgba(0,0,0,0.2);
        max-width: 500px;
      }
      p { color: #666; font-size: 18px; }";

/// Page shown when the client is already connected.
#[must_use]
pub fn connected_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>WhatsApp Relay - QR Code</title>
    <style>{PAGE_STYLE}
      h1 {{ color: #25D366; margin: 0 0 20px 0; }}
      .icon {{ font-size: 80px; margin-bottom: 20px; }}
    </style>
  </head>
  <body>
    <div class="container">
      <div class="icon">&#9989;</div>
      <h1>Connected</h1>
      <p>The WhatsApp client is connected and ready to use.</p>
      <p>There is no need to scan a QR code.</p>
    </div>
  </body>
</html>
"#
    )
}

/// Page shown while no pairing code is available yet. Reloads every 3 seconds.
#[must_use]
pub fn initializing_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>WhatsApp Relay - QR Code</title>
    <meta http-equiv="refresh" content="3">
    <style>{PAGE_STYLE}
      h1 {{ color: #667eea; margin: 0 0 20px 0; }}
      .loader {{
        border: 4px solid #f3f3f3;
        border-top: 4px solid #667eea;
        border-radius: 50%;
        width: 50px;
        height: 50px;
        animation: spin 1s linear infinite;
        margin: 20px auto;
      }}
      @keyframes spin {{
        0% {{ transform: rotate(0deg); }}
        100% {{ transform: rotate(360deg); }}
      }}
    </style>
  </head>
  <body>
    <div class="container">
      <div class="loader"></div>
      <h1>Generating QR code...</h1>
      <p>The WhatsApp client is starting.</p>
      <p><small>This page refreshes automatically</small></p>
    </div>
  </body>
</html>
"#
    )
}

/// Page shown when the client lost its session or failed to start.
///
/// Reloads every 10 seconds, since the client may re-pair on its own.
#[must_use]
pub fn disconnected_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>WhatsApp Relay - QR Code</title>
    <meta http-equiv="refresh" content="10">
    <style>{PAGE_STYLE}
      h1 {{ color: #e74c3c; margin: 0 0 20px 0; }}
      code {{ background: #f5f5f5; padding: 2px 6px; border-radius: 4px; }}
    </style>
  </head>
  <body>
    <div class="container">
      <h1>Disconnected</h1>
      <p>The WhatsApp client is not connected.</p>
      <p>Restart it with <code>POST /api/messages/restart</code> to get a new QR code.</p>
      <p><small>This page refreshes automatically</small></p>
    </div>
  </body>
</html>
"#
    )
}

/// Page embedding the pairing code image. Reloads every 30 seconds so a
/// rotated code is picked up.
#[must_use]
pub fn pairing_page(image_src: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>WhatsApp Relay - QR Code</title>
    <meta http-equiv="refresh" content="30">
    <style>{PAGE_STYLE}
      h1 {{ color: #25D366; margin: 0 0 10px 0; }}
      .subtitle {{ color: #666; margin-bottom: 30px; font-size: 16px; }}
      .qr-container {{ padding: 20px; display: inline-block; margin-bottom: 20px; }}
      img {{ max-width: 100%; height: auto; }}
      .instructions {{
        text-align: left;
        background: #f8f9fa;
        padding: 20px;
        border-radius: 10px;
        margin-top: 20px;
      }}
      .instructions li {{ margin: 10px 0; color: #555; }}
      .button {{
        display: inline-block;
        background: #25D366;
        color: white;
        padding: 12px 30px;
        border-radius: 25px;
        text-decoration: none;
        margin: 10px 5px;
      }}
      .button:hover {{ background: #128C7E; }}
      .refresh-info {{ color: #999; font-size: 12px; margin-top: 20px; }}
    </style>
  </head>
  <body>
    <div class="container">
      <h1>Link your WhatsApp</h1>
      <p class="subtitle">Scan this QR code with the WhatsApp app on your phone</p>
      <div class="qr-container">
        <img src="{image_src}" alt="WhatsApp QR Code">
      </div>
      <div>
        <a href="/api/messages/qr?format=download" class="button">Download QR</a>
        <a href="/api/messages/qr?format=png" class="button" target="_blank">View image</a>
      </div>
      <div class="instructions">
        <strong>Instructions:</strong>
        <ol>
          <li>Open WhatsApp on your phone</li>
          <li>Go to <strong>Settings</strong> &gt; <strong>Linked devices</strong></li>
          <li>Tap <strong>Link a device</strong></li>
          <li>Scan this QR code</li>
        </ol>
      </div>
      <p class="refresh-info">This page refreshes automatically every 30 seconds</p>
    </div>
  </body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn renders_png_of_fixed_size() {
        let png = render_png("2@AbCdEf123,key,other,1").unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);

        let img = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!(img.width(), IMAGE_SIZE);
        assert_eq!(img.height(), IMAGE_SIZE);

        // Quiet zone is white, finder pattern corner is dark
        let gray = img.to_luma8();
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        let span = {
            let code = QrCode::with_error_correction_level(
                "2@AbCdEf123,key,other,1".as_bytes(),
                EcLevel::M,
            )
            .unwrap();
            code.width() as u32 + QUIET_ZONE * 2
        };
        let first_module = (QUIET_ZONE * IMAGE_SIZE).div_ceil(span) + 1;
        assert_eq!(gray.get_pixel(first_module, first_module)[0], 0);
    }

    #[test]
    fn data_url_prefix() {
        let url = render_data_url("payload").unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn oversized_payload_fails() {
        let payload = "x".repeat(8000);
        assert!(matches!(render_png(&payload), Err(QrError::Encode(_))));
    }

    #[test]
    fn pages() {
        assert!(initializing_page().contains(r#"<meta http-equiv="refresh" content="3">"#));
        assert!(!connected_page().contains("refresh"));
        assert!(disconnected_page().contains("/api/messages/restart"));

        let page = pairing_page("data:image/png;base64,AAAA");
        assert!(page.contains(r#"<img src="data:image/png;base64,AAAA""#));
        assert!(page.contains(r#"content="30""#));
        assert!(page.contains("format=download"));
        assert!(page.contains("format=png"));
    }
}
