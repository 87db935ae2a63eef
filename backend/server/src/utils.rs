use tokio::task::spawn_blocking;

use crate::{
    config::Config,
    error::AppError,
    payloads::{GenerateRequest, SizeInput},
    render::{OptionsError, OutputFormat, RenderOptions, RenderedImage, render},
};

pub fn require_text(text: Option<&str>) -> Result<&str, AppError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::Validation("Text is required".to_string())),
    }
}

/// Integer part of a size, mirroring `parseInt`.
fn parse_size(size: &SizeInput) -> Option<i64> {
    match size {
        SizeInput::Number(n) if n.is_finite() => Some(n.trunc() as i64),
        SizeInput::Number(_) => None,
        SizeInput::Text(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
                .map_or(s.len(), |(i, _)| i);

            s[..end].parse().ok()
        }
    }
}

pub fn render_options(request: &GenerateRequest, config: &Config) -> Result<RenderOptions, AppError> {
    let mut options = RenderOptions::default();

    if let Some(size) = &request.size {
        let max = config.max_qr_size;

        options.size = parse_size(size)
            .filter(|n| (1..=i64::from(max)).contains(n))
            .map(|n| n as u32)
            .ok_or(OptionsError::InvalidSize { max })?;
    }
    if let Some(color) = &request.color {
        options.foreground = color.parse()?;
    }
    if let Some(color) = &request.background_color {
        options.background = color.parse()?;
    }
    if let Some(level) = &request.error_correction {
        options.error_correction = level.parse()?;
    }

    Ok(options)
}

pub fn output_format(format: Option<&str>) -> Result<OutputFormat, AppError> {
    Ok(format.map_or(Ok(OutputFormat::Png), str::parse)?)
}

/// Runs the encoder off the async workers.
pub async fn render_blocking(
    text: &str,
    options: &RenderOptions,
    format: OutputFormat,
) -> Result<RenderedImage, AppError> {
    let text = text.to_string();
    let options = options.clone();

    Ok(spawn_blocking(move || render(&text, &options, format)).await??)
}
