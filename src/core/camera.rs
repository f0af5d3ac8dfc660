//! A pinhole camera with an optional thin lens. The camera is given
//! by its position and an orthonormal basis (view, up, right), the
//! film resolution and the angular size of one pixel. A non-zero
//! **lens_radius** together with **focal_distance** produces depth of
//! field.

// wavefront
use crate::core::geometry::{vec3_cross_vec3, Point2f, Point3f, Ray, Vector3f};
use crate::core::pbrt::{radians, Float};
use crate::core::sampling::concentric_sample_disk;

#[derive(Debug, Copy, Clone)]
pub struct Camera {
    pub position: Point3f,
    pub view: Vector3f,
    pub up: Vector3f,
    pub right: Vector3f,
    /// (width, height) in pixels
    pub resolution: (u32, u32),
    /// angular size of one pixel along x and y
    pub pixel_length: Point2f,
    pub focal_distance: Float,
    pub lens_radius: Float,
}

impl Camera {
    /// Build a camera at *eye* looking at *look_at* with a vertical
    /// field of view *fovy* given in degrees.
    pub fn look_at(
        eye: Point3f,
        look_at: Point3f,
        up: Vector3f,
        fovy: Float,
        resolution: (u32, u32),
        lens_radius: Float,
        focal_distance: Float,
    ) -> Self {
        let view: Vector3f = (look_at - eye).normalize();
        let right: Vector3f = vec3_cross_vec3(&view, &up).normalize();
        let up: Vector3f = vec3_cross_vec3(&right, &view).normalize();
        let y_scaled: Float = radians(fovy * 0.5 as Float).tan();
        let aspect: Float = resolution.0 as Float / resolution.1 as Float;
        let x_scaled: Float = y_scaled * aspect;
        Camera {
            position: eye,
            view,
            up,
            right,
            resolution,
            pixel_length: Point2f {
                x: 2.0 as Float * x_scaled / resolution.0 as Float,
                y: 2.0 as Float * y_scaled / resolution.1 as Float,
            },
            focal_distance,
            lens_radius,
        }
    }
    pub fn num_pixels(&self) -> usize {
        self.resolution.0 as usize * self.resolution.1 as usize
    }
    /// Pixel coordinates (x, y) of a linear pixel index.
    pub fn pixel_coords(&self, pixel_index: usize) -> (u32, u32) {
        let w: usize = self.resolution.0 as usize;
        ((pixel_index % w) as u32, (pixel_index / w) as u32)
    }
    /// Direction through position *film* of pixel (x, y), where
    /// *film* is the offset inside the pixel in [0,1)^2.
    fn direction(&self, x: u32, y: u32, film: &Point2f) -> Vector3f {
        let half_w: Float = self.resolution.0 as Float * 0.5 as Float;
        let half_h: Float = self.resolution.1 as Float * 0.5 as Float;
        (self.view
            + self.right * (self.pixel_length.x * (x as Float + film.x - half_w))
            - self.up * (self.pixel_length.y * (y as Float + film.y - half_h)))
            .normalize()
    }
    /// Primary ray through pixel (x, y). *film* offsets the ray inside
    /// the pixel, *lens* picks the point on the aperture.
    pub fn generate_ray(&self, x: u32, y: u32, film: &Point2f, lens: &Point2f) -> Ray {
        let dir: Vector3f = self.direction(x, y, film);
        let mut ray: Ray = Ray::new(self.position, dir);
        // modify ray for depth of field
        if self.lens_radius > 0.0 as Float {
            let p_lens: Point2f = concentric_sample_disk(lens) * self.lens_radius;
            let p_focus: Point3f = ray.position(self.focal_distance);
            ray.o = self.position + self.right * p_lens.x + self.up * p_lens.y;
            ray.d = (p_focus - ray.o).normalize();
        }
        ray
    }
    /// Un-jittered pinhole ray through the centre of pixel (x, y).
    pub fn generate_center_ray(&self, x: u32, y: u32) -> Ray {
        Ray::new(
            self.position,
            self.direction(x, y, &Point2f { x: 0.5, y: 0.5 }),
        )
    }
}
