//! Serde adapters for glam vectors.
//!
//! Use with `#[serde(with = "crate::serde_utils::vec3")]`. Vectors are
//! written as plain arrays: `[x, y, z]` and `[r, g, b, a]`.

/// `Vec3` as `[x, y, z]`.
pub mod vec3 {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(v: &Vec3, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        v.to_array().serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        <[f32; 3]>::deserialize(d).map(Vec3::from_array)
    }
}

/// `Vec4` colors as `[r, g, b, a]`.
pub mod rgba {
    use glam::Vec4;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(v: &Vec4, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        v.to_array().serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec4, D::Error>
    where
        D: Deserializer<'de>,
    {
        <[f32; 4]>::deserialize(d).map(Vec4::from_array)
    }
}
