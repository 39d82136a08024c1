//! Rotation matrices between ground and camera axes.
//!
//! `R_GC = Rz(kappa) * Ry(phi) * Rx(omega)` rotates ground-frame vectors into
//! the camera frame. The backprojection kernel relies on this exact order;
//! the footprint estimator uses its transpose.

use crate::types::{Attitude, OrthoError, OrthoResult};

pub type Matrix3 = [[f64; 3]; 3];

fn mat_mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut m = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            m[i][j] = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    m
}

fn mat_vec(m: &Matrix3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn transpose(m: &Matrix3) -> Matrix3 {
    let mut t = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            t[i][j] = m[j][i];
        }
    }
    t
}

fn determinant(m: &Matrix3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Frobenius norm of `M * M^T - I`
fn orthonormality_error(m: &Matrix3) -> f64 {
    let p = mat_mul(m, &transpose(m));
    let mut sum = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            let identity = if i == j { 1.0 } else { 0.0 };
            sum += (p[i][j] - identity).powi(2);
        }
    }
    sum.sqrt()
}

/// Ground-to-camera rotation (R_GC)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundToCamera(Matrix3);

/// Camera-to-ground rotation (R_CG), the transpose of R_GC
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraToGround(Matrix3);

impl GroundToCamera {
    pub fn from_attitude(attitude: &Attitude) -> OrthoResult<Self> {
        if !attitude.is_finite() {
            return Err(OrthoError::InvalidInput(format!(
                "non-finite attitude: {:?}",
                attitude
            )));
        }

        let (so, co) = attitude.omega.sin_cos();
        let (sp, cp) = attitude.phi.sin_cos();
        let (sk, ck) = attitude.kappa.sin_cos();

        let rx = [[1.0, 0.0, 0.0], [0.0, co, so], [0.0, -so, co]];
        let ry = [[cp, 0.0, -sp], [0.0, 1.0, 0.0], [sp, 0.0, cp]];
        let rz = [[ck, sk, 0.0], [-sk, ck, 0.0], [0.0, 0.0, 1.0]];

        Ok(Self(mat_mul(&mat_mul(&rz, &ry), &rx)))
    }

    pub fn matrix(&self) -> &Matrix3 {
        &self.0
    }

    /// Rotate a ground-frame vector into camera axes
    pub fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        mat_vec(&self.0, v)
    }

    pub fn transpose(&self) -> CameraToGround {
        CameraToGround(transpose(&self.0))
    }

    pub fn determinant(&self) -> f64 {
        determinant(&self.0)
    }

    pub fn orthonormality_error(&self) -> f64 {
        orthonormality_error(&self.0)
    }

    /// Reject matrices that are not a proper rotation within `tolerance`
    pub fn check_orthonormal(&self, tolerance: f64) -> OrthoResult<()> {
        let error = self.orthonormality_error();
        let det = self.determinant();
        if error < tolerance && approx::abs_diff_eq!(det, 1.0, epsilon = tolerance) {
            Ok(())
        } else {
            Err(OrthoError::DegenerateGeometry(format!(
                "rotation matrix is not orthonormal (|RR^T - I| = {:e}, det = {})",
                error, det
            )))
        }
    }
}

impl CameraToGround {
    pub fn matrix(&self) -> &Matrix3 {
        &self.0
    }

    /// Rotate a camera-frame vector into ground axes
    pub fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        mat_vec(&self.0, v)
    }

    pub fn transpose(&self) -> GroundToCamera {
        GroundToCamera(transpose(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_for_zero_attitude() {
        let r = GroundToCamera::from_attitude(&Attitude::default()).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(r.matrix()[i][j], expected, epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_orthonormal_over_angle_grid() {
        let angles = [-3.0, -1.2, -0.3, 0.0, 0.25, 0.9, 2.5];
        for &omega in &angles {
            for &phi in &angles {
                for &kappa in &angles {
                    let r = GroundToCamera::from_attitude(&Attitude::new(omega, phi, kappa)).unwrap();
                    assert!(r.orthonormality_error() < 1e-9);
                    assert_abs_diff_eq!(r.determinant(), 1.0, epsilon = 1e-9);
                    assert!(r.check_orthonormal(1e-9).is_ok());
                }
            }
        }
    }

    #[test]
    fn test_composition_order() {
        // Pure kappa rotation of the ground x axis
        let kappa = 0.3f64;
        let r = GroundToCamera::from_attitude(&Attitude::new(0.0, 0.0, kappa)).unwrap();
        let v = r.apply([1.0, 0.0, 0.0]);
        assert_abs_diff_eq!(v[0], kappa.cos(), epsilon = 1e-15);
        assert_abs_diff_eq!(v[1], -kappa.sin(), epsilon = 1e-15);

        // Rz * Ry * Rx differs from Rx * Ry * Rz for combined rotations
        let att = Attitude::new(0.2, 0.4, 0.6);
        let r = GroundToCamera::from_attitude(&att).unwrap();
        let (so, co) = att.omega.sin_cos();
        let (sp, cp) = att.phi.sin_cos();
        let (sk, ck) = att.kappa.sin_cos();
        assert_abs_diff_eq!(r.matrix()[0][0], cp * ck, epsilon = 1e-15);
        assert_abs_diff_eq!(r.matrix()[0][2], -sp * ck * co + sk * so, epsilon = 1e-15);
        assert_abs_diff_eq!(r.matrix()[2][0], sp, epsilon = 1e-15);
    }

    #[test]
    fn test_transpose_inverts() {
        let r = GroundToCamera::from_attitude(&Attitude::new(0.1, -0.2, 1.3)).unwrap();
        let v = [3.0, -4.0, 12.0];
        let back = r.transpose().apply(r.apply(v));
        for i in 0..3 {
            assert_abs_diff_eq!(back[i], v[i], epsilon = 1e-12);
        }
        assert_eq!(r.transpose().transpose(), r);
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = GroundToCamera::from_attitude(&Attitude::new(f64::NAN, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, OrthoError::InvalidInput(_)));
    }
}
