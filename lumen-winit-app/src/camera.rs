use glam::{Mat4, Vec3};

/// 围绕一个目标点旋转的相机
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,

    pub yaw_deg: f32,
    pub pitch_deg: f32,

    pub fov_y_deg: f32,
    aspect_ratio: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 3.0,
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            fov_y_deg: 60.0,
            aspect_ratio: 16.0 / 9.0,
            z_near: 0.01,
            z_far: 1000.0,
        }
    }
}

impl OrbitCamera {
    const CAMERA_UP: Vec3 = Vec3::Y;

    /// 避免与 up 向量共线
    const K_PITCH: f32 = 89.5;

    const MIN_DISTANCE: f32 = 0.05;

    /// yaw 和 pitch 都为 0 时相机位于目标的 +Z 方向
    pub fn eye(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw_deg.to_radians(), self.pitch_deg.to_radians());
        let dir = Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos());
        self.target + dir * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Self::CAMERA_UP)
    }

    /// vulkan 的 NDC 中 y 向下，这里翻转 y 轴
    pub fn projection_matrix(&self) -> Mat4 {
        let mut proj = Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect_ratio, self.z_near, self.z_far);
        proj.y_axis.y *= -1.0;
        proj
    }

    /// projection * view * model
    #[inline]
    pub fn mvp(&self, model: &Mat4) -> Mat4 {
        self.projection_matrix() * self.view_matrix() * *model
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// 窗口最小化时尺寸为 0，此时保持原来的宽高比
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    pub fn rotate(&mut self, yaw_deg: f32, pitch_deg: f32) {
        self.yaw_deg = (self.yaw_deg + yaw_deg).rem_euclid(360.0);
        self.pitch_deg = (self.pitch_deg + pitch_deg).clamp(-Self::K_PITCH, Self::K_PITCH);
    }

    /// 每一格滚轮缩放 10%
    pub fn zoom(&mut self, wheel_lines: f32) {
        self.distance = (self.distance * 0.9_f32.powf(wheel_lines)).max(Self::MIN_DISTANCE);
    }
}

/// 将鼠标输入转换为相机的旋转和缩放
///
/// 左键拖动旋转，滚轮缩放
#[derive(Debug, Default)]
pub struct CameraController {
    camera: OrbitCamera,
    dragging: bool,
    last_cursor: Option<[f64; 2]>,
}

impl CameraController {
    /// 每个像素对应的旋转角度
    const DEG_PER_PIXEL: f32 = 0.3;

    #[inline]
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    #[inline]
    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn on_left_button(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    pub fn on_cursor_moved(&mut self, position: [f64; 2]) {
        if let Some(last) = self.last_cursor {
            if self.dragging {
                let dx = (position[0] - last[0]) as f32;
                let dy = (position[1] - last[1]) as f32;
                // 向右拖动时模型跟随鼠标向右转，向下拖动时相机升高
                self.camera.rotate(-dx * Self::DEG_PER_PIXEL, dy * Self::DEG_PER_PIXEL);
            }
        }
        self.last_cursor = Some(position);
    }

    pub fn on_wheel(&mut self, lines: f32) {
        self.camera.zoom(lines);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    #[test]
    fn default_eye_is_on_positive_z() {
        let camera = OrbitCamera::default();
        assert!((camera.eye() - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn up_maps_to_negative_ndc_y() {
        let camera = OrbitCamera::default();
        let clip = camera.mvp(&Mat4::IDENTITY) * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(clip.y / clip.w < 0.0);

        // 目标点在屏幕中心
        let center = camera.mvp(&Mat4::IDENTITY) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((center.x / center.w).abs() < 1e-5);
        assert!((center.y / center.w).abs() < 1e-5);
        assert!((0.0..=1.0).contains(&(center.z / center.w)));
    }

    #[test]
    fn model_scale_is_applied_before_view() {
        let camera = OrbitCamera::default();
        let scaled = camera.mvp(&Mat4::from_scale(Vec3::splat(2.0))) * Vec4::new(0.0, 0.5, 0.0, 1.0);
        let unscaled = camera.mvp(&Mat4::IDENTITY) * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!((scaled / scaled.w - unscaled / unscaled.w).length() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped_and_yaw_wraps() {
        let mut camera = OrbitCamera::default();
        camera.rotate(-30.0, 200.0);
        assert_eq!(camera.pitch_deg, 89.5);
        assert!((camera.yaw_deg - 330.0).abs() < 1e-4);
    }

    #[test]
    fn zoom_never_reaches_the_target() {
        let mut camera = OrbitCamera::default();
        camera.zoom(1.0);
        assert!((camera.distance - 2.7).abs() < 1e-5);
        camera.zoom(1000.0);
        assert_eq!(camera.distance, 0.05);
    }

    #[test]
    fn minimized_window_keeps_aspect_ratio() {
        let mut camera = OrbitCamera::default();
        camera.set_viewport(800, 400);
        camera.set_viewport(0, 0);
        assert_eq!(camera.aspect_ratio(), 2.0);
    }

    #[test]
    fn only_dragging_rotates() {
        let mut controller = CameraController::default();
        controller.on_cursor_moved([100.0, 100.0]);
        controller.on_cursor_moved([200.0, 100.0]);
        assert_eq!(controller.camera().yaw_deg, 0.0);

        controller.on_left_button(true);
        controller.on_cursor_moved([210.0, 110.0]);
        assert!((controller.camera().yaw_deg - 357.0).abs() < 1e-4);
        assert!((controller.camera().pitch_deg - 3.0).abs() < 1e-4);

        controller.on_left_button(false);
        controller.on_cursor_moved([300.0, 300.0]);
        assert!((controller.camera().pitch_deg - 3.0).abs() < 1e-4);
    }
}
