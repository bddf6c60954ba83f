//! Display discovery entry points.
//!
//! Displays are discovered, not created: the same physical display shows up
//! in every enumeration, from any thread, and must present one stable
//! surrogate across all of them. Display modes likewise keep their identity
//! across repeated queries of the same display.

use vkshim_protocol::types::{DisplayModeProperties, DisplayProperties, Extent2D};
use vkshim_protocol::{ObjectType, RealId, Status, SurrogateId};

use crate::{Driver, Layer};

impl<D: Driver> Layer<D> {
    pub fn get_display_properties(
        &self,
        count: &mut u32,
        properties: Option<&mut [DisplayProperties<SurrogateId>]>,
    ) -> Status {
        let Some(out) = properties else {
            return self.driver.get_display_properties(count, None);
        };

        let mut locals: Vec<DisplayProperties<RealId>> = (0..out.len())
            .map(|_| DisplayProperties {
                display: RealId::NULL,
                display_name: String::new(),
                physical_resolution: Extent2D {
                    width: 0,
                    height: 0,
                },
            })
            .collect();
        let status = self.driver.get_display_properties(count, Some(&mut locals));
        if status.wrote_output() {
            let written = (*count as usize).min(out.len());
            for (dst, src) in out.iter_mut().zip(locals.into_iter().take(written)) {
                *dst = DisplayProperties {
                    display: self.ctx.adopt(ObjectType::Display, src.display),
                    display_name: src.display_name,
                    physical_resolution: src.physical_resolution,
                };
            }
        }
        status
    }

    pub fn get_display_mode_properties(
        &self,
        display: SurrogateId,
        count: &mut u32,
        properties: Option<&mut [DisplayModeProperties<SurrogateId>]>,
    ) -> Status {
        let real_display = self.ctx.resolve(display);
        let Some(out) = properties else {
            return self
                .driver
                .get_display_mode_properties(real_display, count, None);
        };

        let mut locals: Vec<DisplayModeProperties<RealId>> = (0..out.len())
            .map(|_| DisplayModeProperties {
                display_mode: RealId::NULL,
                visible_region: Extent2D {
                    width: 0,
                    height: 0,
                },
                refresh_rate: 0,
            })
            .collect();
        let status = self
            .driver
            .get_display_mode_properties(real_display, count, Some(&mut locals));
        if status.wrote_output() {
            let written = (*count as usize).min(out.len());
            for (dst, src) in out.iter_mut().zip(locals.into_iter().take(written)) {
                *dst = DisplayModeProperties {
                    display_mode: self.ctx.adopt(ObjectType::DisplayMode, src.display_mode),
                    visible_region: src.visible_region,
                    refresh_rate: src.refresh_rate,
                };
            }
        }
        status
    }
}
