//! scene-bridge binary.
//!
//! Hosts a scene, opens the agent channel, announces its port to the agent
//! server and drives the capture / send / await loop at a fixed 50 Hz tick
//! until interrupted.
//!
//! # Environment Variables
//!
//! - `SCENE_BRIDGE_CONFIG`: YAML config file (optional)
//! - `SCENE_BRIDGE_CHANNEL`, `SCENE_BRIDGE_HANDSHAKE_URL`, `SCENE_BRIDGE_BIND`,
//!   `SCENE_BRIDGE_INTERVAL_SECS`: override the matching config fields
//! - `SCENE_FILE`: YAML scene to host (default: a small built-in scene)
//! - `SCENE_EXPORT_PATH`: write an authoring export of the scene there and exit
//! - `RUST_LOG`: tracing filter (default: "info,semantic_scene=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin scene-bridge
//! SCENE_EXPORT_PATH=out/scene.json cargo run --bin scene-bridge
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use glam::{Quat, Vec2, Vec3};
use image::RgbImage;
use tokio::time::MissedTickBehavior;

use semantic_scene::agent::{AgentLoopController, AgentRuntime, GateFlags, ServiceRegistry};
use semantic_scene::bridge::{BridgeChannel, ChannelService, HandshakeClient};
use semantic_scene::capture::{CaptureError, FrameSource, JpegFrameCapture};
use semantic_scene::commands::{ButtonFinder, CommandDispatcher, HostEffectors};
use semantic_scene::scene::{
    Camera, Capability, CapabilityKind, Entity, PerspectiveCamera, Scene, SceneNode, SceneSource,
};
use semantic_scene::semantic::{export_to_file, ExportSettings};
use semantic_scene::utilities::config::BridgeConfig;

const FIXED_DT: f32 = 0.02;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,semantic_scene=debug".into()),
        )
        .init();

    let config_path = std::env::var("SCENE_BRIDGE_CONFIG").ok().map(PathBuf::from);
    let config = BridgeConfig::load(config_path.as_deref()).context("Failed to load bridge config")?;

    let scene = match std::env::var("SCENE_FILE") {
        Ok(path) => Scene::from_yaml_file(&path).with_context(|| format!("Failed to load scene {}", path))?,
        Err(_) => demo_scene(),
    };

    if let Ok(path) = std::env::var("SCENE_EXPORT_PATH") {
        let bytes = export_to_file(&scene, ExportSettings::editor_authoring(), &path)?;
        tracing::info!("Exported '{}' to {} ({} bytes)", scene.scene_name(), path, bytes);
        return Ok(());
    }

    let registry = ServiceRegistry::new();
    let service = registry.register(ChannelService::new());
    let channel = Arc::new(
        BridgeChannel::open(Arc::clone(&service), &config.bind_address, &config.channel_name)
            .await
            .context("Failed to open agent channel")?,
    );
    registry.register(Arc::clone(&channel));

    let address = service.address().context("Channel service has no bound address")?;
    let port = address.port();
    tracing::info!("scene-bridge listening on ws://{}/{}", address, config.channel_name);
    HandshakeClient::new(config.handshake_url.clone(), config.handshake_timeout())
        .announce(port)
        .await;

    let gate = registry.register(Arc::new(GateFlags::new(true)));
    let controller = AgentLoopController::new(config.loop_settings()).with_gate(gate);
    let capture = JpegFrameCapture::new(SyntheticFrames::new(1920, 1080), config.capture);
    let mut runtime: AgentRuntime<DemoHost> =
        AgentRuntime::new(controller, config.export, Arc::new(capture), channel.clone());

    channel.on_message(CommandDispatcher::new(runtime.deferred(), runtime.signal()).into_handler())?;

    let mut host = DemoHost::new(scene, Vec2::new(1920.0, 1080.0));
    let mut ticker = tokio::time::interval(Duration::from_secs_f32(FIXED_DT));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                runtime.fixed_update(&mut host, FIXED_DT);
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    tracing::info!(
        "Agent performed {} actions; {} services torn down",
        runtime.controller().actions().len(),
        registry.teardown()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Demo host
// ---------------------------------------------------------------------------

struct DemoHost {
    scene: Scene,
    viewport: Vec2,
}

impl DemoHost {
    fn new(scene: Scene, viewport: Vec2) -> Self {
        Self { scene, viewport }
    }
}

impl SceneSource for DemoHost {
    fn scene_name(&self) -> &str {
        self.scene.scene_name()
    }

    fn roots(&self) -> Vec<&dyn SceneNode> {
        self.scene.roots()
    }

    fn layer_name(&self, layer: u8) -> String {
        self.scene.layer_name(layer)
    }

    fn camera(&self) -> Option<&dyn Camera> {
        self.scene.camera()
    }
}

impl HostEffectors for DemoHost {
    fn viewport_size(&self) -> Vec2 {
        self.viewport
    }

    fn click_at(&mut self, pixel: Vec2) {
        tracing::info!("Click at ({:.0}, {:.0})", pixel.x, pixel.y);
    }

    fn click_button(&mut self, name: &str, ancestor: Option<&str>) -> bool {
        match ButtonFinder::find(&self.scene, name, ancestor) {
            Some(hit) => {
                tracing::info!("Pressed {}", hit.path);
                true
            }
            None => false,
        }
    }
}

/// Gradient frames standing in for a renderer.
struct SyntheticFrames {
    width: u32,
    height: u32,
}

impl SyntheticFrames {
    fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[async_trait]
impl FrameSource for SyntheticFrames {
    async fn next_frame(&self) -> Result<RgbImage, CaptureError> {
        let (w, h) = (self.width.max(1), self.height.max(1));
        Ok(RgbImage::from_fn(w, h, |x, y| {
            image::Rgb([(x * 255 / w) as u8, (y * 255 / h) as u8, 96])
        }))
    }
}

fn demo_scene() -> Scene {
    let button = |name: &str| Entity::new(name).with_capability(Capability::builtin(CapabilityKind::Button, "Button"));

    Scene::new("Arena")
        .with_camera(PerspectiveCamera::new(Vec3::new(0.0, 2.0, 10.0), Quat::IDENTITY))
        .with_root(Entity::new("GameManager").with_capability(Capability::custom("Game", "TurnManager")))
        .with_root(
            Entity::new("Player")
                .at(Vec3::new(-2.0, 0.0, 0.0))
                .with_capability(Capability::builtin(CapabilityKind::SkinnedRig, "SkinnedMeshRenderer"))
                .with_child(Entity::new("Armature").with_child(Entity::new("Hips"))),
        )
        .with_root(
            Entity::new("Enemy")
                .at(Vec3::new(3.0, 0.0, -4.0))
                .with_capability(Capability::builtin(CapabilityKind::Collider, "BoxCollider")),
        )
        .with_root(
            Entity::new("HUD")
                .with_layer(5)
                .with_capability(Capability::builtin(CapabilityKind::Canvas, "Canvas"))
                .with_child(Entity::new("ActionBar").with_child(button("Attack")).with_child(button("EndTurn"))),
        )
}
