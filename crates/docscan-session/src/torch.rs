// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Torch control.

use std::sync::Arc;

use docscan_bridge::{NativeTorch, PlatformBridge};
use docscan_core::error::Result;
use docscan_core::types::TorchMode;
use tracing::{debug, info, warn};

use crate::session::SessionLifecycle;

/// Toggles the torch of the session's wide camera.
#[derive(Clone)]
pub struct TorchController {
    bridge: Arc<dyn PlatformBridge>,
    level: f32,
}

impl TorchController {
    pub fn new(bridge: Arc<dyn PlatformBridge>, level: f32) -> Self {
        Self {
            bridge,
            level: level.clamp(f32::MIN_POSITIVE, 1.0),
        }
    }

    pub fn is_on(&self) -> bool {
        self.bridge.has_torch() && self.bridge.torch_mode().is_on()
    }

    /// Turn the torch off if it is on or the session is not active,
    /// otherwise turn it on. A device without a torch is left alone.
    pub fn toggle(&self, lifecycle: SessionLifecycle) -> Result<TorchMode> {
        if !self.bridge.has_torch() {
            debug!("Torch toggle ignored, device has no torch");
            return Ok(TorchMode::Off);
        }
        let mode = if self.bridge.torch_mode().is_on() || lifecycle != SessionLifecycle::Active {
            TorchMode::Off
        } else {
            TorchMode::On { level: self.level }
        };
        self.bridge.set_torch(mode)?;
        info!(?mode, "Torch toggled");
        Ok(mode)
    }

    pub fn turn_off(&self) -> Result<()> {
        if self.is_on() {
            self.bridge.set_torch(TorchMode::Off)?;
            debug!("Torch off");
        }
        Ok(())
    }

    /// Guard that turns the torch off when dropped.
    pub fn guard(&self) -> TorchGuard {
        TorchGuard {
            controller: self.clone(),
        }
    }
}

/// Turns the torch off on drop, whatever happened while it was alive.
pub struct TorchGuard {
    controller: TorchController,
}

impl Drop for TorchGuard {
    fn drop(&mut self) {
        if let Err(e) = self.controller.turn_off() {
            warn!(error = %e, "Failed to turn torch off after capture");
        }
    }
}
