//! Role preset picker overlay.

use super::Screen;
use crate::app::App;
use crate::text::truncate_to_width;
use crate::ui::centered_fixed;
use crate::ui::theme::{Styles, Symbols};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use rolechat_engine::RolePreset;

pub struct PresetPickerScreen;

impl Screen for PresetPickerScreen {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let presets = RolePreset::all();
        let height = (presets.len() * 2 + 4) as u16;
        let overlay_area = centered_fixed(
            84.min(area.width.saturating_sub(2)),
            height.min(area.height),
            area,
        );
        Clear.render(overlay_area, buf);

        let block = Block::default()
            .title(" Role preset ")
            .title_style(Styles::title())
            .borders(Borders::ALL)
            .border_style(Styles::border_active())
            .style(Styles::default());
        let inner = block.inner(overlay_area);
        block.render(overlay_area, buf);

        let active = app.conversation.preset();
        let detail_width = (inner.width as usize).saturating_sub(5);
        let mut lines = Vec::new();
        for (i, preset) in presets.iter().enumerate() {
            let selected = i == app.picker_index;
            let marker = if selected { Symbols::SELECTED } else { " " };
            let style = if selected {
                Styles::highlight()
            } else {
                Styles::default()
            };
            let mut row = vec![Span::styled(
                format!("{marker} {}. {}", i + 1, preset.label()),
                style,
            )];
            if *preset == active {
                row.push(Span::styled(format!(" {}", Symbols::ACTIVE), Styles::active()));
            }
            lines.push(Line::from(row));
            lines.push(Line::from(Span::styled(
                format!("     {}", truncate_to_width(preset.content(), detail_width)),
                Styles::dim(),
            )));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "  Enter select   1-4 pick   Esc close",
            Styles::dim(),
        )));

        Paragraph::new(lines).render(inner, buf);
    }
}
