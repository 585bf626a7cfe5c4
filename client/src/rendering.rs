use crate::entity::{Entity, PlayerData, ProjectileData};
use crate::game::{Game, Phase};
use crate::transport::Transport;
use macroquad::prelude::*;
use shared::{Position, MAX_HP, SHIP_HEIGHT, SHIP_WIDTH, WORLD_BOUND};

const LASER_COLORS: [Color; 4] = [BLUE, GREEN, RED, RED];
const LASER_LENGTH: f32 = 30.0;
const STAR_RADIUS: f32 = 8.0;

pub struct Renderer {
    width: f32,
    height: f32,
    camera: Position,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Renderer {
            width: width as f32,
            height: height as f32,
            camera: Position::new(WORLD_BOUND / 2.0, WORLD_BOUND / 2.0),
        })
    }

    pub fn render<T: Transport>(&mut self, game: &Game<T>) {
        clear_background(Color::from_rgba(10, 10, 26, 255));

        // Camera stays where it was once the follow target is cleared.
        if let Some(target) = game.follow_target() {
            self.camera = target;
        }

        self.draw_world_edge();

        for star in game.stars().iter_live().filter(|s| s.visible) {
            let (x, y) = self.to_screen(star.position);
            draw_circle(x, y, STAR_RADIUS, GOLD);
        }

        for laser in game.lasers().iter_live().filter(|l| l.visible) {
            self.draw_laser(laser);
        }

        for player in game.players().iter_live() {
            let color = if player.locally_controlled {
                GREEN
            } else {
                Color::from_rgba(255, 68, 68, 255)
            };
            self.draw_ship(player, color);
        }

        self.draw_ui(game);
    }

    fn to_screen(&self, point: Position) -> (f32, f32) {
        world_to_screen(self.camera, point, self.width, self.height)
    }

    fn draw_world_edge(&self) {
        let (x, y) = self.to_screen(Position::new(0.0, 0.0));
        draw_rectangle_lines(
            x,
            y,
            WORLD_BOUND,
            WORLD_BOUND,
            2.0,
            Color::from_rgba(68, 68, 68, 255),
        );
    }

    fn draw_ship(&self, player: &Entity<PlayerData>, color: Color) {
        let (x, y) = self.to_screen(player.position);
        let heading = player.angle.to_radians();
        let forward = vec2(heading.sin(), -heading.cos());
        let side = vec2(-forward.y, forward.x);
        let center = vec2(x, y);

        let nose = center + forward * (SHIP_HEIGHT / 2.0);
        let left = center - forward * (SHIP_HEIGHT / 2.0) + side * (SHIP_WIDTH / 2.0);
        let right = center - forward * (SHIP_HEIGHT / 2.0) - side * (SHIP_WIDTH / 2.0);
        draw_triangle(nose, left, right, color);
        draw_triangle_lines(nose, left, right, 2.0, WHITE);

        let label = format!("{} ({})", player.id, player.data.score);
        draw_text(&label, x - SHIP_WIDTH / 2.0, y - SHIP_HEIGHT / 2.0 - 6.0, 16.0, WHITE);
    }

    fn draw_laser(&self, laser: &Entity<ProjectileData>) {
        let (x, y) = self.to_screen(laser.position);
        let heading = laser.angle.to_radians();
        let half = vec2(heading.sin(), -heading.cos()) * (LASER_LENGTH / 2.0);
        let color = LASER_COLORS[(laser.data.owner_id % 4) as usize];
        draw_line(x - half.x, y - half.y, x + half.x, y + half.y, 3.0, color);
    }

    fn draw_ui<T: Transport>(&self, game: &Game<T>) {
        let hud = game.hud();
        let hp = game.health();

        draw_rectangle(10.0, 10.0, 200.0, 14.0, Color::from_rgba(51, 51, 51, 255));
        draw_rectangle(10.0, 10.0, 2.0 * hp as f32, 14.0, health_color(hp));
        draw_rectangle_lines(10.0, 10.0, 200.0, 14.0, 1.0, WHITE);

        let lines = [
            format!("HP: {}  Score: {}", hp, game.score()),
            format!("{}  FPS: {}", hud.rtt_text(), hud.fps()),
            hud.coordinates_text(),
        ];
        for (i, line) in lines.iter().enumerate() {
            draw_text(line, 10.0, 44.0 + i as f32 * 18.0, 18.0, WHITE);
        }

        for (i, entry) in hud.ranking().iter().take(10).enumerate() {
            let text = format!("{}. {} - {}", i + 1, entry.id, entry.score);
            let color = if entry.is_local { GREEN } else { WHITE };
            draw_text(&text, self.width - 160.0, 24.0 + i as f32 * 18.0, 18.0, color);
        }

        let center_x = self.width / 2.0 - 120.0;
        let center_y = self.height / 2.0;
        if let Some(error) = game.connection_error() {
            draw_text(error, 10.0, self.height - 16.0, 18.0, RED);
        }
        if game.phase() == Phase::GameOver {
            draw_text("GAME OVER", center_x, center_y, 48.0, RED);
            draw_text("Press R to restart", center_x, center_y + 30.0, 24.0, WHITE);
        } else if game.local_player().is_none() {
            draw_text("Press Enter to spawn", center_x, center_y, 24.0, WHITE);
        }
    }
}

/// Maps a world point to screen space with `camera` at the screen center.
pub fn world_to_screen(camera: Position, point: Position, width: f32, height: f32) -> (f32, f32) {
    (
        point.x - camera.x + width / 2.0,
        point.y - camera.y + height / 2.0,
    )
}

pub fn health_color(hp: i32) -> Color {
    if hp > MAX_HP / 2 {
        GREEN
    } else if hp > MAX_HP / 4 {
        YELLOW
    } else {
        RED
    }
}
