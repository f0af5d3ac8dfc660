//! The **Scene** owns everything the stages read but never write:
//! geometry, materials, lights and the acceleration structure.

// others
use tracing::debug;
// wavefront
use crate::accelerators::bvh::BVHAccel;
use crate::core::error::RenderError;
use crate::core::geometry::Bounds3f;
use crate::core::light::Light;
use crate::core::material::Material;
use crate::core::shape::Geom;

/// Maximum number of primitives per BVH leaf.
pub const MAX_PRIMS_IN_NODE: usize = 4;

pub struct Scene {
    pub geoms: Vec<Geom>,
    pub materials: Vec<Material>,
    /// emissive geometry in the order it appears in `geoms`
    pub lights: Vec<Light>,
    /// index into `lights` for every geometry, `None` if it does not emit
    pub light_ids: Vec<Option<usize>>,
    pub aggregate: BVHAccel,
}

impl Scene {
    pub fn new(geoms: Vec<Geom>, materials: Vec<Material>) -> Result<Self, RenderError> {
        let mut lights: Vec<Light> = Vec::new();
        let mut light_ids: Vec<Option<usize>> = vec![None; geoms.len()];
        for (geom_id, geom) in geoms.iter().enumerate() {
            let material: &Material = materials.get(geom.material_id()).ok_or_else(|| {
                RenderError::InvalidConfig(format!(
                    "geometry {} references material {} but only {} exist",
                    geom_id,
                    geom.material_id(),
                    materials.len()
                ))
            })?;
            if material.is_emissive() {
                light_ids[geom_id] = Some(lights.len());
                lights.push(Light::new(geom_id, geom, material.le()));
            }
        }
        let aggregate: BVHAccel = BVHAccel::new(&geoms, MAX_PRIMS_IN_NODE);
        debug!(
            geoms = geoms.len(),
            lights = lights.len(),
            nodes = aggregate.nodes.len(),
            "scene ready"
        );
        Ok(Scene {
            geoms,
            materials,
            lights,
            light_ids,
            aggregate,
        })
    }
    /// Whether the light on *geom_id* is among the first *light_count*
    /// lights, the ones explicit light sampling picks from.
    pub fn is_sampled_light(&self, geom_id: usize, light_count: usize) -> bool {
        match self.light_ids.get(geom_id) {
            Some(Some(light_id)) => *light_id < light_count,
            _ => false,
        }
    }
    pub fn world_bound(&self) -> Bounds3f {
        self.aggregate.world_bound()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::geometry::Point3f;
    use crate::core::pbrt::{Float, Spectrum};
    use crate::core::shape::Sphere;

    fn ball(x: Float, material_id: usize) -> Geom {
        Geom::Sphere(Sphere {
            center: Point3f::new(x, 0.0, 0.0),
            radius: 0.5,
            material_id,
        })
    }

    #[test]
    fn lights_follow_geometry_order() {
        let materials = vec![
            Material::diffuse(Spectrum::new(0.5)),
            Material::emissive(Spectrum::new(1.0), 4.0),
        ];
        let geoms = vec![ball(0.0, 1), ball(2.0, 0), ball(4.0, 1)];
        let scene = Scene::new(geoms, materials).unwrap();
        assert_eq!(scene.light_ids, vec![Some(0), None, Some(1)]);
        assert_eq!(scene.lights[1].geom_id, 2);
        assert!(scene.is_sampled_light(0, 1));
        assert!(!scene.is_sampled_light(2, 1));
        assert!(scene.is_sampled_light(2, 2));
        assert!(!scene.is_sampled_light(1, 2));
        assert!(!scene.is_sampled_light(0, 0));
    }

    #[test]
    fn unknown_material_is_rejected() {
        let materials = vec![Material::diffuse(Spectrum::new(0.5))];
        match Scene::new(vec![ball(0.0, 3)], materials) {
            Err(RenderError::InvalidConfig(_)) => {}
            _ => panic!("material 3 does not exist"),
        }
    }
}
