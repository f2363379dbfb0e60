//! Interactive viewer for the cube using kiss3d.
//!
//! Keys 1-9 pick the face anchor the next drag turns through, right-button
//! drags turn the layer, `C` cancels a turn in progress.

use std::time::Instant;

use kiss3d::prelude::*;

use cubeturn::cube::Piece;
use cubeturn::scene::SceneGraph;
use cubeturn::Puzzle;

const TITLE: &str = "[1-9] anchor, [right drag] turn, [C] cancel";

/// Color for a piece, derived from the cell it was assembled in so that
/// turned layers stay recognizable.
fn piece_color(piece: &Piece) -> Color {
    let (x, y, z) = piece.home;
    let channel = |c: i32| 0.35 + 0.3 * (c + 1) as f32;
    Color::new(channel(x), channel(y), channel(z), 1.0)
}

/// Drag state between frames.
#[derive(Debug, Default)]
struct Drag {
    held: bool,
    /// Set until the first frame with movement opens the gesture.
    starting: bool,
    last_cursor: Option<(f64, f64)>,
    /// Cursor movement since the previous frame, y up.
    delta: (f32, f32),
}

impl Drag {
    fn take_delta(&mut self) -> glam::Vec2 {
        let (x, y) = std::mem::take(&mut self.delta);
        glam::Vec2::new(x, y)
    }
}

/// Opens the viewer and runs until the window closes.
pub fn play(puzzle: Puzzle, piece_size: f32) {
    pollster::block_on(play_async(puzzle, piece_size));
}

async fn play_async(mut puzzle: Puzzle, size: f32) {
    let mut window = Window::new(&format!("Anchor 5 - {TITLE}")).await;

    let mut camera = OrbitCamera3d::default();
    camera.set_dist(9.0);

    let mut scene = SceneNode3d::empty();
    scene
        .add_light(Light::point(100.0))
        .set_position(Vec3::new(5.0, 5.0, -6.0));

    let mut nodes: Vec<SceneNode3d> = puzzle
        .cube
        .pieces()
        .iter()
        .map(|piece| scene.add_cube(size, size, size).set_color(piece_color(piece)))
        .collect();

    let mut drag = Drag::default();
    let mut last_frame = Instant::now();

    loop {
        for event in window.events().iter() {
            use kiss3d::event::{Action, Key, MouseButton, WindowEvent};
            match event.value {
                WindowEvent::Key(key, Action::Press, _) => {
                    let anchor = match key {
                        Key::Key1 => Some(0),
                        Key::Key2 => Some(1),
                        Key::Key3 => Some(2),
                        Key::Key4 => Some(3),
                        Key::Key5 => Some(4),
                        Key::Key6 => Some(5),
                        Key::Key7 => Some(6),
                        Key::Key8 => Some(7),
                        Key::Key9 => Some(8),
                        Key::C => {
                            puzzle.cancel();
                            drag = Drag::default();
                            None
                        }
                        _ => None,
                    };
                    if let Some(anchor) = anchor {
                        puzzle.active_anchor = anchor;
                        window.set_title(&format!("Anchor {} - {TITLE}", anchor + 1));
                    }
                }
                WindowEvent::MouseButton(MouseButton::Button2, action, _) => match action {
                    Action::Press => {
                        drag.held = true;
                        drag.starting = true;
                        drag.delta = (0.0, 0.0);
                    }
                    Action::Release => {
                        if drag.held && !drag.starting {
                            let delta = drag.take_delta();
                            if let Some(snap) = puzzle.drag_end(delta) {
                                log::info!("snapping {}° to {}°", snap.current, snap.target);
                            }
                        }
                        drag.held = false;
                        drag.starting = false;
                    }
                    _ => {}
                },
                WindowEvent::CursorPos(x, y, _) => {
                    if let (true, Some((last_x, last_y))) = (drag.held, drag.last_cursor) {
                        drag.delta.0 += (x - last_x) as f32;
                        // screen y grows downwards
                        drag.delta.1 -= (y - last_y) as f32;
                    }
                    drag.last_cursor = Some((x, y));
                }
                _ => {}
            }
        }

        if drag.held && drag.delta != (0.0, 0.0) {
            let delta = drag.take_delta();
            if drag.starting {
                drag.starting = false;
                puzzle.drag_begin(delta);
            } else {
                puzzle.drag_update(delta);
            }
        }

        let now = Instant::now();
        puzzle.tick(now - last_frame);
        last_frame = now;

        for (piece, node) in puzzle.cube.pieces().iter().zip(&mut nodes) {
            match puzzle.stage.world_transform(piece.node) {
                Ok(pose) => {
                    node.set_position(Vec3::from_array(pose.translation.to_array()));
                    node.set_rotation(Quat::from_array(pose.rotation.to_array()));
                }
                Err(e) => log::warn!("error reading pose of {:?}: {e}", piece.node),
            }
        }

        if !window.render_3d(&mut scene, &mut camera).await {
            break;
        }
    }
}
