use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, StrokeKind, Vec2};

#[derive(Clone, Copy, Debug)]
pub(super) struct Viewport {
    pub(super) rect: Rect,
    pub(super) pan: Vec2,
    pub(super) zoom: f32,
    pub(super) origin: Vec2,
}

impl Viewport {
    pub(super) fn to_screen(self, world: Pos2) -> Pos2 {
        self.rect.center() + self.pan + (world.to_vec2() - self.origin) * self.zoom
    }

    pub(super) fn to_world(self, screen: Pos2) -> Pos2 {
        (((screen - self.rect.center() - self.pan) / self.zoom) + self.origin).to_pos2()
    }

    pub(super) fn scale(self, length: f32) -> f32 {
        length * self.zoom
    }

    pub(super) fn circle_visible(self, center: Pos2, radius: f32) -> bool {
        self.rect.expand(radius).contains(center)
    }

    pub(super) fn segment_visible(self, start: Pos2, end: Pos2, padding: f32) -> bool {
        Rect::from_two_pos(start, end)
            .expand(padding)
            .intersects(self.rect)
    }
}

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| ((a as f32 * (1.0 - amount)) + (b as f32 * amount)) as u8;

    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

pub(super) fn draw_background(painter: &Painter, viewport: Viewport, canvas: Vec2) {
    let rect = viewport.rect;
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (50.0 * viewport.zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = viewport.to_screen(Pos2::ZERO);
    let grid = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], grid);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], grid);
        y += step;
    }

    let frame = Rect::from_two_pos(origin, viewport.to_screen(canvas.to_pos2()));
    painter.rect_stroke(
        frame,
        0.0,
        Stroke::new(1.0, Color32::from_rgba_unmultiplied(140, 150, 160, 90)),
        StrokeKind::Inside,
    );
}
