use super::Context;
use crate::rules::{Category, Field};
use crate::section::Section;
use crate::types::{Device, DeviceType};

pub(super) fn detect(ctx: &mut Context<'_>) -> Device {
    let mut fields = ctx.match_rules(Category::Device, ctx.ua);
    let mut device = Device {
        kind: fields.take(Field::Type),
        model: fields.take(Field::Model),
        vendor: fields.take(Field::Vendor),
    };

    let reading = ctx.reading().clone();
    if device.kind.is_empty() {
        let kind = if ctx.flags.bot {
            DeviceType::Bot
        } else if reading.mobile {
            DeviceType::Mobile
        } else {
            ctx.flags.device_defaulted = true;
            DeviceType::Desktop
        };
        device.kind = kind.as_str().to_string();
    }

    if device.kind == DeviceType::Mobile.as_str() && device.model.is_empty() {
        device.model = model_from_comments(ctx.sections.first(), &reading.platform);
    }
    device
}

/// Handsets name themselves in the platform comment, usually right before a
/// `Build/` token.
fn model_from_comments(first: Option<&Section<'_>>, platform: &str) -> String {
    if platform == "iPhone" || platform == "iPad" {
        return platform.to_string();
    }
    let Some(first) = first else {
        return String::new();
    };
    let comments = &first.comments;

    if first.name == "Mozilla" && platform == "Linux" && comments.len() > 2 {
        let mut candidate = comments[2];
        if candidate.contains("Android") || candidate.contains("Linux") {
            candidate = comments[comments.len() - 1];
        }
        return before_build(candidate).to_string();
    }

    comments
        .iter()
        .rev()
        .find(|c| c.contains("Build"))
        .map(|c| before_build(c).to_string())
        .unwrap_or_default()
}

fn before_build(comment: &str) -> &str {
    comment.split("Build").next().unwrap_or_default().trim_matches(' ')
}
