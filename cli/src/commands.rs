use perch_core::PerchSettingsExt;
use perch_overlay::{PointerEvent, PointerPhase};
use perch_types::{ConfigValue, Dimension, InstanceId, PerchSettings, ToolKind};

use crate::context::CliContext;

const DRAG_STEPS: i32 = 4;

pub async fn add(ctx: &CliContext, tool: ToolKind) -> Result<(), String> {
    let id = ctx
        .overlays
        .add_instance(tool)
        .await
        .map_err(|e| e.to_string())?;
    println!("added {tool} #{id}");
    Ok(())
}

pub async fn remove(ctx: &CliContext, tool: ToolKind, id: InstanceId) -> Result<(), String> {
    let removed = ctx
        .overlays
        .remove_instance(tool, id)
        .await
        .map_err(|e| e.to_string())?;
    if removed {
        println!("removed {tool} #{id}");
    } else {
        println!("{tool} #{id} is not running");
    }
    Ok(())
}

pub async fn clone_instance(ctx: &CliContext, tool: ToolKind, from: InstanceId) -> Result<(), String> {
    let id = ctx
        .overlays
        .clone_instance(tool, from)
        .await
        .map_err(|e| e.to_string())?;
    println!("cloned {tool} #{from} as #{id}");
    Ok(())
}

pub async fn set(
    ctx: &CliContext,
    tool: ToolKind,
    id: InstanceId,
    field: &str,
    value: &str,
) -> Result<(), String> {
    let value = ConfigValue::parse_literal(value);
    let changed = ctx
        .overlays
        .update_config(tool, id, field, value.clone())
        .await
        .map_err(|e| e.to_string())?;
    if changed {
        println!("{tool} #{id}: {field} = {value}");
    } else {
        println!("{tool} #{id}: {field} unchanged");
    }
    Ok(())
}

pub async fn move_instance(
    ctx: &CliContext,
    tool: ToolKind,
    id: InstanceId,
    dx: i32,
    dy: i32,
) -> Result<(), String> {
    let geometry = ctx
        .overlays
        .move_instance(tool, id, dx, dy)
        .await
        .map_err(|e| e.to_string())?;
    println!("{tool} #{id} at ({}, {})", geometry.x, geometry.y);
    Ok(())
}

pub async fn resize(
    ctx: &CliContext,
    tool: ToolKind,
    id: InstanceId,
    width: Dimension,
    height: Dimension,
) -> Result<(), String> {
    let geometry = ctx
        .overlays
        .resize_instance(tool, id, width, height)
        .await
        .map_err(|e| e.to_string())?;
    println!("{tool} #{id} size {} x {}", geometry.width, geometry.height);
    Ok(())
}

pub async fn lock(ctx: &CliContext, tool: ToolKind, id: InstanceId, locked: bool) -> Result<(), String> {
    ctx.overlays
        .set_locked(tool, id, locked)
        .await
        .map_err(|e| e.to_string())?;
    println!("{tool} #{id} {}", if locked { "locked" } else { "unlocked" });
    Ok(())
}

/// Press and release at a screen position on an instance's surface
pub async fn tap(ctx: &CliContext, tool: ToolKind, id: InstanceId, x: f32, y: f32) -> Result<(), String> {
    let t = ctx.now_ms();
    pointer(ctx, tool, id, PointerEvent::new(PointerPhase::Down, 0, x, y, t)).await?;
    pointer(ctx, tool, id, PointerEvent::new(PointerPhase::Up, 0, x, y, t + 30)).await
}

/// Press at a screen position, move by (dx, dy) in a few steps, release
pub async fn drag(
    ctx: &CliContext,
    tool: ToolKind,
    id: InstanceId,
    (x, y): (f32, f32),
    (dx, dy): (f32, f32),
) -> Result<(), String> {
    let t = ctx.now_ms();
    pointer(ctx, tool, id, PointerEvent::new(PointerPhase::Down, 0, x, y, t)).await?;
    for step in 1..=DRAG_STEPS {
        let f = step as f32 / DRAG_STEPS as f32;
        let event = PointerEvent::new(
            PointerPhase::Move,
            0,
            x + dx * f,
            y + dy * f,
            t + 10 * step as u64,
        );
        pointer(ctx, tool, id, event).await?;
    }
    let end = PointerEvent::new(PointerPhase::Up, 0, x + dx, y + dy, t + 60);
    pointer(ctx, tool, id, end).await
}

async fn pointer(ctx: &CliContext, tool: ToolKind, id: InstanceId, event: PointerEvent) -> Result<(), String> {
    ctx.overlays
        .inject_pointer(tool, id, event)
        .await
        .map_err(|e| e.to_string())
}

pub async fn list(ctx: &CliContext) -> Result<(), String> {
    let records = ctx.overlays.list().await.map_err(|e| e.to_string())?;
    if records.is_empty() {
        println!("No overlays running");
        return Ok(());
    }

    println!(
        "{:<14} {:>3} {:>6} {:>6} {:>8} {:>8}  Config",
        "Tool", "Id", "X", "Y", "Width", "Height"
    );
    println!("{}", "-".repeat(80));
    for record in records {
        let config: Vec<String> = record
            .config
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect();
        println!(
            "{:<14} {:>3} {:>6} {:>6} {:>8} {:>8}  {}{}",
            record.tool.config_key(),
            record.id,
            record.window_x,
            record.window_y,
            record.window_width.to_string(),
            record.window_height.to_string(),
            config.join(" "),
            if record.is_locked { " (locked)" } else { "" },
        );
    }
    println!(
        "{} overlay(s) active, presence {}",
        ctx.registry.total_count(),
        if ctx.overlays.presence_active() { "on" } else { "off" }
    );
    Ok(())
}

pub async fn restore(ctx: &CliContext) -> Result<(), String> {
    let restored = ctx.overlays.restore().await.map_err(|e| e.to_string())?;
    for (tool, id) in &restored {
        println!("restored {tool} #{id}");
    }
    println!("{} instance(s) restored", restored.len());
    Ok(())
}

pub async fn reset_default(ctx: &CliContext, tool: ToolKind) -> Result<(), String> {
    ctx.overlays
        .reset_default(tool)
        .await
        .map_err(|e| e.to_string())?;
    println!("default for {tool} reset");
    Ok(())
}

pub fn show_settings(ctx: &CliContext) {
    let settings = &ctx.settings;
    if let Some(path) = PerchSettings::settings_path() {
        println!("Settings file:     {}", path.display());
    }
    println!("Record directory:  {}", settings.resolved_store_dir().display());
    println!("Clone offset:      {}px", settings.clone_offset_px);
    println!("Pass-through:      {}ms", settings.pass_through_restore_ms);
    println!(
        "Gestures:          slop {}px, tap {}ms, double tap {}ms, edge band {}px",
        settings.gesture.touch_slop_px,
        settings.gesture.tap_timeout_ms,
        settings.gesture.double_tap_timeout_ms,
        settings.gesture.resize_band_px
    );
    for tool in ToolKind::all() {
        println!(
            "  {:<14} max {}",
            tool.config_key(),
            settings.max_instances(*tool)
        );
    }
}

pub fn exit() {
    println!("quitting...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::ConfigStore;
    use std::time::Duration;

    fn ctx() -> CliContext {
        CliContext::with_store(PerchSettings::default(), ConfigStore::in_memory()).unwrap()
    }

    fn id(n: u32) -> InstanceId {
        InstanceId::new(n).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drag_moves_the_instance() {
        let ctx = ctx();
        add(&ctx, ToolKind::Coin).await.unwrap();
        // Coin at (260, 200), 180x180; grab the middle
        drag(&ctx, ToolKind::Coin, id(1), (350.0, 260.0), (-60.0, 40.0))
            .await
            .unwrap();

        let mut records = Vec::new();
        for _ in 0..100 {
            records = ctx.overlays.list().await.unwrap();
            if records[0].window_x == 200 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!((records[0].window_x, records[0].window_y), (200, 240));
        ctx.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_instance_is_an_error_message() {
        let ctx = ctx();
        let err = set(&ctx, ToolKind::Clock, id(4), "show_seconds", "false")
            .await
            .unwrap_err();
        assert!(err.contains("not running"));
        remove(&ctx, ToolKind::Clock, id(4)).await.unwrap();
    }
}
