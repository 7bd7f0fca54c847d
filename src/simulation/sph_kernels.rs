use serde::{Deserialize, Serialize};

use crate::floating_type_mod::{FT, PI};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum KernelFamily {
    /// Normalized over the 3D ball of radius h. The pressure gradient is the
    /// 3D spiky derivative `(h-r)^2 / h^6`, not the planar `(h-r)^3 / h^5`.
    Volumetric3d,

    /// Planar (2D-normalized) constants of the reference scenes.
    Planar,
}

/// Normalization constants for one smoothing radius. Computed once per
/// parameter set instead of per particle pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConstants {
    pub h: FT,
    pub h2: FT,
    pub density: FT,
    pub pressure_gradient: FT,
    pub viscosity_laplacian: FT,
}

// Sync is needed since we use this trait inside parallel iterators
pub trait SphKernels: Sync + Send + 'static {
    const FAMILY: KernelFamily;

    fn constants(h: FT) -> KernelConstants;

    /// Density kernel W(r, h). Takes the squared distance.
    fn density(c: &KernelConstants, r2: FT) -> FT;

    /**
     * Magnitude of the pressure-gradient kernel. Negative inside the support,
     * the direction is supplied by the caller.
     */
    fn pressure_gradient(c: &KernelConstants, r: FT) -> FT;

    fn viscosity_laplacian(c: &KernelConstants, r: FT) -> FT;
}

#[inline(always)]
fn poly6_unnormalized(c: &KernelConstants, r2: FT) -> FT {
    if r2 < c.h2 {
        let v = c.h2 - r2;
        v * v * v
    } else {
        0.
    }
}

#[allow(dead_code)]
pub enum Volumetric3d {}
impl SphKernels for Volumetric3d {
    const FAMILY: KernelFamily = KernelFamily::Volumetric3d;

    fn constants(h: FT) -> KernelConstants {
        let h2 = h * h;
        let h3 = h2 * h;
        let h6 = h3 * h3;
        KernelConstants {
            h,
            h2,
            density: 315. / (64. * PI * h6 * h3),
            pressure_gradient: -45. / (PI * h6),
            viscosity_laplacian: 45. / (PI * h6),
        }
    }

    #[inline(always)]
    fn density(c: &KernelConstants, r2: FT) -> FT {
        c.density * poly6_unnormalized(c, r2)
    }

    #[inline(always)]
    fn pressure_gradient(c: &KernelConstants, r: FT) -> FT {
        if r < c.h {
            let v = c.h - r;
            c.pressure_gradient * v * v
        } else {
            0.
        }
    }

    #[inline(always)]
    fn viscosity_laplacian(c: &KernelConstants, r: FT) -> FT {
        if r < c.h {
            c.viscosity_laplacian * (c.h - r)
        } else {
            0.
        }
    }
}

#[allow(dead_code)]
pub enum Planar {}
impl SphKernels for Planar {
    const FAMILY: KernelFamily = KernelFamily::Planar;

    fn constants(h: FT) -> KernelConstants {
        let h2 = h * h;
        let h4 = h2 * h2;
        let h5 = h4 * h;
        KernelConstants {
            h,
            h2,
            density: 4. / (PI * h4 * h4),
            pressure_gradient: -10. / (PI * h5),
            viscosity_laplacian: 40. / (PI * h5),
        }
    }

    #[inline(always)]
    fn density(c: &KernelConstants, r2: FT) -> FT {
        c.density * poly6_unnormalized(c, r2)
    }

    #[inline(always)]
    fn pressure_gradient(c: &KernelConstants, r: FT) -> FT {
        if r < c.h {
            let v = c.h - r;
            c.pressure_gradient * v * v * v
        } else {
            0.
        }
    }

    #[inline(always)]
    fn viscosity_laplacian(c: &KernelConstants, r: FT) -> FT {
        if r < c.h {
            c.viscosity_laplacian * (c.h - r)
        } else {
            0.
        }
    }
}

#[test]
fn volumetric_density_kernel_integration_test() {
    let h: FT = 0.5;
    let c = Volumetric3d::constants(h);

    // radial integral over the ball: int_0^h W(r) 4 pi r^2 dr (midpoint rule)
    let steps = 20000;
    let dr = h / steps as FT;
    let mut integral: f64 = 0.;
    for k in 0..steps {
        let r = (k as FT + 0.5) * dr;
        integral += (Volumetric3d::density(&c, r * r) * 4. * PI * r * r * dr) as f64;
    }

    println!("Integration of 3D density kernel with h={:.2}: {}", h, integral);
    assert!((integral - 1.).abs() < 1e-3);
}

#[test]
fn planar_density_kernel_integration_test() {
    let h: FT = 0.5;
    let c = Planar::constants(h);

    // int_0^h W(r) 2 pi r dr
    let steps = 20000;
    let dr = h / steps as FT;
    let mut integral: f64 = 0.;
    for k in 0..steps {
        let r = (k as FT + 0.5) * dr;
        integral += (Planar::density(&c, r * r) * 2. * PI * r * dr) as f64;
    }

    println!("Integration of planar density kernel with h={:.2}: {}", h, integral);
    assert!((integral - 1.).abs() < 1e-3);
}

#[test]
fn volumetric_pressure_gradient_derivative_test() {
    // the gradient must be dW/dr of the 3D spiky kernel 15/(pi h^6) (h-r)^3
    fn spiky(r: FT, h: FT) -> FT {
        if r < h {
            15. / (PI * h.powi(6)) * (h - r).powi(3)
        } else {
            0.
        }
    }

    let h: FT = 1.;
    let c = Volumetric3d::constants(h);
    let diff = 1e-3;
    for k in 1..20 {
        let r = k as FT * 0.05;
        let approx = (spiky(r + diff * 0.5, h) - spiky(r - diff * 0.5, h)) / diff;
        let analytical = Volumetric3d::pressure_gradient(&c, r);
        println!("r={} analytical={} approx={}", r, analytical, approx);
        assert!((analytical - approx).abs() < 1e-2);
        assert!(analytical < 0.);
    }
}

#[test]
fn kernels_vanish_at_and_beyond_support_radius() {
    fn inner<K: SphKernels>() {
        let h: FT = 0.2;
        let c = K::constants(h);
        for r in [h, h * 1.0001, 2. * h, 100.] {
            assert_eq!(K::density(&c, r * r), 0.);
            assert_eq!(K::pressure_gradient(&c, r), 0.);
            assert_eq!(K::viscosity_laplacian(&c, r), 0.);
        }
        let inside = h * 0.5;
        assert!(K::density(&c, inside * inside) > 0.);
        assert!(K::pressure_gradient(&c, inside) < 0.);
        assert!(K::viscosity_laplacian(&c, inside) > 0.);
    }

    inner::<Volumetric3d>();
    inner::<Planar>();
}

#[test]
fn reference_constants_for_unit_radius() {
    let c = Planar::constants(1.);
    crate::assert_ft_approx_eq(c.density, 4. / PI, 1e-6, || "density constant".to_string());
    crate::assert_ft_approx_eq(c.pressure_gradient, -10. / PI, 1e-6, || "gradient constant".to_string());
    crate::assert_ft_approx_eq(c.viscosity_laplacian, 40. / PI, 1e-6, || "laplacian constant".to_string());
    assert_eq!(Planar::density(&c, 0.), 4. / PI);
}
