//! Drawing of players and status indicators with macroquad

use macroquad::prelude::*;
use shared::{ClientGameState, Identity, Position};

pub const PLAYER_RADIUS: f32 = 25.0;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub connected: bool,
    pub prediction_enabled: bool,
    pub interpolation_enabled: bool,
    pub pending_snapshots: usize,
}

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn render(&mut self, state: &ClientGameState, config: RenderConfig) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        self.draw_track();

        let mut others: Vec<(&Identity, &Position)> = state.others.iter().collect();
        others.sort();
        for (id, x) in &others {
            self.draw_player(**x, Color::from_rgba(255, 68, 68, 255));
            self.draw_player_id(id, **x);
        }

        // Drawn last so the local player stays visible on overlap
        self.draw_player(state.you, BLUE);

        self.draw_ui(&config, others.len() + 1);
    }

    fn track_y(&self) -> f32 {
        self.height / 2.0
    }

    fn draw_track(&mut self) {
        draw_line(
            0.0,
            self.track_y(),
            self.width,
            self.track_y(),
            1.0,
            Color::from_rgba(68, 68, 68, 255),
        );
    }

    fn draw_player(&mut self, x: Position, color: Color) {
        let x = x as f32;
        draw_circle(x, self.track_y(), PLAYER_RADIUS, color);
        draw_circle_lines(x, self.track_y(), PLAYER_RADIUS, 2.0, WHITE);
    }

    fn draw_player_id(&mut self, id: &str, x: Position) {
        let y = self.track_y() - PLAYER_RADIUS - 6.0;
        draw_text(id, x as f32 - PLAYER_RADIUS / 2.0, y, 14.0, WHITE);
    }

    fn draw_ui(&mut self, config: &RenderConfig, player_count: usize) {
        let y_start = 10.0;
        let indicator_size = 12.0;
        let spacing = 25.0;

        let features = [
            ("P", config.prediction_enabled),
            ("I", config.interpolation_enabled),
        ];

        for (i, (label, enabled)) in features.iter().enumerate() {
            let x = 10.0 + (i as f32) * spacing;
            let color = if *enabled { GREEN } else { RED };

            draw_rectangle(x, y_start, indicator_size, indicator_size, color);
            draw_rectangle_lines(x, y_start, indicator_size, indicator_size, 1.0, WHITE);

            draw_text(label, x + 3.0, y_start + indicator_size + 12.0, 12.0, WHITE);
        }

        let connection_color = if config.connected { GREEN } else { RED };
        draw_rectangle(10.0, y_start + 35.0, 8.0, 8.0, connection_color);
        draw_text("CON", 20.0, y_start + 35.0 + 8.0, 12.0, WHITE);

        let buffer_y = y_start + 50.0;
        for i in 0..(config.pending_snapshots.min(10)) {
            draw_rectangle(
                10.0 + (i as f32) * 3.0,
                buffer_y,
                2.0,
                8.0,
                Color::from_rgba(0, 170, 255, 255),
            );
        }
        let buffer_text = format!("{} buffered", config.pending_snapshots);
        draw_text(&buffer_text, 45.0, buffer_y + 8.0, 12.0, WHITE);

        let player_text = format!("{} players", player_count);
        draw_text(&player_text, 45.0, buffer_y + 23.0, 12.0, WHITE);
    }
}
