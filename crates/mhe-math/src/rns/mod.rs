//! Residue Number System tools for the hybrid key switching: the gadget
//! decomposition of a polynomial modulo Q into digits over QP, and the
//! division by P of a polynomial over QP.

use crate::{
    rq::{rows, rows_mut, Poly, PolyQP, Representation, RingQP},
    zq::Modulus,
    Error, Result,
};
use itertools::izip;
use std::{ops::Range, sync::Arc};

/// Product of `moduli` reduced modulo `m`.
fn product_mod(moduli: impl Iterator<Item = u64>, m: &Modulus) -> u64 {
    moduli.fold(m.reduce(1), |acc, qi| m.mul(acc, m.reduce(qi)))
}

/// Gadget decomposition for a fixed shape.
///
/// The moduli of Q are split into RNS groups of as many moduli as P has (one
/// modulus per group when there is no P), and each group residue is further
/// split into base 2^w digits when `base_two = w` is nonzero. The gadget
/// vector is `g[i][j] = P * 2^(w * j) * e_i` where `e_i` is 1 modulo the
/// moduli of the group `i` and 0 modulo the other moduli.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposer {
    ring: Arc<RingQP>,
    level_q: usize,
    level_p: Option<usize>,
    base_two: usize,
    group_size: usize,
    digit_count: usize,
    /// P mod q_k for the moduli of Q up to `level_q`.
    p_mod_q: Vec<u64>,
}

impl Decomposer {
    /// Creates a decomposer for a gadget ciphertext at levels `level_q` and
    /// `level_p`, with digits of `base_two` bits (0 to disable the digits).
    ///
    /// Returns an error if the levels are not supported by the ring, or if
    /// digits are requested with more than one modulus in P, or if `base_two`
    /// is not smaller than the size of every modulus.
    pub fn new(
        ring: &Arc<RingQP>,
        level_q: usize,
        level_p: Option<usize>,
        base_two: usize,
    ) -> Result<Self> {
        ring.check_levels(level_q, level_p)?;
        let group_size = level_p.map_or(1, |l| l + 1);
        let q_moduli = &ring.q().moduli_operators()[..=level_q];

        let digit_count = if base_two == 0 {
            1
        } else {
            if group_size > 1 {
                return Err(Error::InvalidDecomposition(format!(
                    "Base 2^{base_two} digits require at most one modulus in P"
                )));
            }
            let p_moduli = match (ring.p(), level_p) {
                (Some(p), Some(l)) => &p.moduli_operators()[..=l],
                _ => &[],
            };
            if q_moduli
                .iter()
                .chain(p_moduli.iter())
                .any(|qi| base_two >= qi.bits())
            {
                return Err(Error::InvalidDecomposition(format!(
                    "Base 2^{base_two} is not smaller than every modulus"
                )));
            }
            let max_bits = q_moduli.iter().map(|qi| qi.bits()).max().unwrap_or(0);
            max_bits.div_ceil(base_two)
        };

        let p_mod_q = q_moduli
            .iter()
            .map(|qi| match (ring.p(), level_p) {
                (Some(p), Some(l)) => product_mod(p.moduli()[..=l].iter().copied(), qi),
                _ => 1,
            })
            .collect();

        Ok(Self {
            ring: ring.clone(),
            level_q,
            level_p,
            base_two,
            group_size,
            digit_count,
            p_mod_q,
        })
    }

    /// Level of Q of the gadget.
    pub fn level_q(&self) -> usize {
        self.level_q
    }

    /// Level of P of the gadget.
    pub fn level_p(&self) -> Option<usize> {
        self.level_p
    }

    /// Number of bits per digit, 0 when there are no digits.
    pub fn base_two(&self) -> usize {
        self.base_two
    }

    /// Number of RNS groups at the level of the gadget.
    pub fn rns_count(&self) -> usize {
        self.rns_count_at(self.level_q)
    }

    /// Number of RNS groups covering the moduli of Q up to `level`.
    pub fn rns_count_at(&self, level: usize) -> usize {
        (level + 1).div_ceil(self.group_size)
    }

    /// Number of digits per RNS group.
    pub fn digit_count(&self) -> usize {
        self.digit_count
    }

    /// Indices of the moduli of Q in the group `i`, truncated at `level`.
    pub fn group(&self, i: usize, level: usize) -> Range<usize> {
        let start = i * self.group_size;
        start..((i + 1) * self.group_size).min(level + 1)
    }

    /// The gadget factor `g[i][j]` modulo each modulus of Q up to the level of
    /// the gadget; the factor is 0 modulo P.
    pub fn gadget_factor(&self, i: usize, j: usize) -> Vec<u64> {
        let group = self.group(i, self.level_q);
        izip!(
            self.ring.q().moduli_operators().iter(),
            self.p_mod_q.iter()
        )
        .enumerate()
        .map(|(k, (qk, pk))| {
            if group.contains(&k) {
                qk.mul(*pk, qk.pow(2, (self.base_two * j) as u64))
            } else {
                0
            }
        })
        .collect()
    }

    /// Decompose a polynomial modulo Q into its digits over QP, in NTT
    /// representation. The output has `rns_count_at(c.level())` rows of
    /// `digit_count()` polynomials at levels `(c.level(), level_p)`.
    pub fn decompose(&self, c: &Poly) -> Result<Vec<Vec<PolyQP>>> {
        let level = c.level();
        if level > self.level_q {
            return Err(Error::InvalidLevel(level, self.level_q));
        }
        debug_assert_eq!(c.ctx(), self.ring.q());

        let mut coefficients = c.clone();
        coefficients.change_representation(Representation::PowerBasis);
        let c_rows = rows(&coefficients.coefficients).collect::<Vec<_>>();

        let mut out = Vec::with_capacity(self.rns_count_at(level));
        for i in 0..self.rns_count_at(level) {
            let group = self.group(i, level);
            let digits = if self.base_two == 0 {
                vec![self.mod_up(&c_rows, group, level)?]
            } else {
                (0..self.digit_count)
                    .map(|j| self.digit(c_rows[group.start], j, level))
                    .collect::<Result<Vec<_>>>()?
            };
            out.push(digits);
        }
        Ok(out)
    }

    /// The `j`-th base 2^w digit of `row`, lifted to every modulus of QP.
    fn digit(&self, row: &[u64], j: usize, level: usize) -> Result<PolyQP> {
        let mask = (1u64 << self.base_two) - 1;
        let shift = self.base_two * j;
        let mut d = self
            .ring
            .zero(level, self.level_p, Representation::PowerBasis)?;
        let values = row
            .iter()
            .map(|v| if shift < 64 { (v >> shift) & mask } else { 0 })
            .collect::<Vec<_>>();
        rows_mut(&mut d.q.coefficients).for_each(|r| r.copy_from_slice(&values));
        if let Some(p) = d.p.as_mut() {
            rows_mut(&mut p.coefficients).for_each(|r| r.copy_from_slice(&values));
        }
        d.change_representation(Representation::Ntt);
        Ok(d)
    }

    /// Approximate basis extension of the residues modulo the moduli of
    /// `group` to every modulus of QP. The output is congruent to the group
    /// residue plus a small multiple of the group modulus.
    fn mod_up(&self, c_rows: &[&[u64]], group: Range<usize>, level: usize) -> Result<PolyQP> {
        let q_ops = self.ring.q().moduli_operators();
        let group_moduli = &self.ring.q().moduli()[group.clone()];

        // y_k = x_k * (Q_g / q_k)^(-1) mod q_k
        let mut y = Vec::with_capacity(group.len());
        for k in group.clone() {
            let qk = &q_ops[k];
            let q_hat = product_mod(
                group_moduli.iter().copied().filter(|m| *m != qk.modulus()),
                qk,
            );
            let q_hat_inv = qk.inv(q_hat).ok_or(Error::InvalidContext)?;
            let mut yk = c_rows[k].to_vec();
            qk.scalar_mul_vec(&mut yk, q_hat_inv);
            y.push(yk);
        }

        let extend = |target: &Modulus, out: &mut [u64]| {
            for (k, yk) in izip!(group.clone(), y.iter()) {
                let q_hat = product_mod(
                    group_moduli
                        .iter()
                        .copied()
                        .filter(|m| *m != q_ops[k].modulus()),
                    target,
                );
                izip!(out.iter_mut(), yk.iter()).for_each(|(o, v)| {
                    *o = target.add(*o, target.mul(target.reduce(*v), q_hat))
                });
            }
        };

        let mut d = self
            .ring
            .zero(level, self.level_p, Representation::PowerBasis)?;
        for (k, (row, qk)) in izip!(rows_mut(&mut d.q.coefficients), q_ops.iter()).enumerate() {
            if group.contains(&k) {
                row.copy_from_slice(c_rows[k]);
            } else {
                extend(qk, row);
            }
        }
        if let (Some(p), Some(ctx)) = (d.p.as_mut(), self.ring.p()) {
            for (row, pj) in izip!(rows_mut(&mut p.coefficients), ctx.moduli_operators()) {
                extend(pj, row);
            }
        }
        d.change_representation(Representation::Ntt);
        Ok(d)
    }
}

/// Precomputed values to divide by `P = p_0 * ... * p_l` for one level `l`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ModDownTable {
    /// (P / p_j)^(-1) mod p_j
    p_hat_inv: Vec<u64>,
    /// (P / p_j) mod q_k, indexed by [j][k]
    p_hat_mod_q: Vec<Vec<u64>>,
    /// P^(-1) mod q_k
    p_inv_mod_q: Vec<u64>,
}

/// Division by P with rounding of a polynomial over QP, via an approximate
/// basis conversion from P to Q.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasisExtender {
    ring: Arc<RingQP>,
    tables: Vec<ModDownTable>,
}

impl BasisExtender {
    /// Precompute the conversion tables for every level of P.
    pub fn new(ring: &Arc<RingQP>) -> Result<Self> {
        let q_ops = ring.q().moduli_operators();
        let mut tables = vec![];
        if let Some(p) = ring.p() {
            let p_ops = p.moduli_operators();
            for level_p in 0..=p.max_level() {
                let p_moduli = &p.moduli()[..=level_p];
                let hats = p_ops[..=level_p]
                    .iter()
                    .map(|pj| p_moduli.iter().copied().filter(move |m| *m != pj.modulus()))
                    .collect::<Vec<_>>();

                let p_hat_inv = izip!(hats.iter(), p_ops.iter())
                    .map(|(hat, pj)| {
                        pj.inv(product_mod(hat.clone(), pj))
                            .ok_or(Error::InvalidContext)
                    })
                    .collect::<Result<Vec<_>>>()?;
                let p_hat_mod_q = hats
                    .iter()
                    .map(|hat| {
                        q_ops
                            .iter()
                            .map(|qk| product_mod(hat.clone(), qk))
                            .collect()
                    })
                    .collect();
                let p_inv_mod_q = q_ops
                    .iter()
                    .map(|qk| {
                        qk.inv(product_mod(p_moduli.iter().copied(), qk))
                            .ok_or(Error::InvalidContext)
                    })
                    .collect::<Result<Vec<_>>>()?;

                tables.push(ModDownTable {
                    p_hat_inv,
                    p_hat_mod_q,
                    p_inv_mod_q,
                });
            }
        }
        Ok(Self {
            ring: ring.clone(),
            tables,
        })
    }

    /// Computes `round(x / P)` modulo Q, up to a small additive error, where P
    /// is the product of the moduli of P up to the level of `x`. The input and
    /// the output are in NTT representation.
    pub fn mod_down(&self, x: &PolyQP) -> Result<Poly> {
        if x.q.representation != Representation::Ntt {
            return Err(Error::IncorrectRepresentation(
                x.q.representation,
                Representation::Ntt,
            ));
        }
        let xp = match &x.p {
            None => return Ok(x.q.clone()),
            Some(xp) => xp,
        };
        let table = self
            .tables
            .get(xp.level())
            .ok_or(Error::InvalidLevel(xp.level(), self.tables.len()))?;
        let q_ops = self.ring.q().moduli_operators();
        let p_ops = xp.ctx.moduli_operators();

        // y_j = [x]_{p_j} * (P / p_j)^(-1) mod p_j
        let mut y = xp.clone();
        y.change_representation(Representation::PowerBasis);
        izip!(rows_mut(&mut y.coefficients), table.p_hat_inv.iter(), p_ops.iter())
            .for_each(|(row, inv, pj)| pj.scalar_mul_vec(row, *inv));

        let mut conv = Poly::zero(self.ring.q(), x.q.level(), Representation::PowerBasis);
        for (k, (row, qk)) in izip!(rows_mut(&mut conv.coefficients), q_ops.iter()).enumerate() {
            for (yj, hats) in izip!(rows(&y.coefficients), table.p_hat_mod_q.iter()) {
                let hat = hats[k];
                izip!(row.iter_mut(), yj.iter())
                    .for_each(|(r, v)| *r = qk.add(*r, qk.mul(qk.reduce(*v), hat)));
            }
        }
        conv.change_representation(Representation::Ntt);

        let mut out = &x.q - &conv;
        out.mul_scalar_rns(&table.p_inv_mod_q);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{BasisExtender, Decomposer};
    use crate::rq::{Context, Poly, PolyQP, Representation, RingQP};
    use num_bigint::BigUint;
    use rand::thread_rng;
    use std::{error::Error, sync::Arc};

    const Q: &[u64; 3] = &[1153, 4611686018326724609, 4611686018309947393];
    const P: &[u64; 2] = &[4611686018232352769, 4611686018171535361];

    fn ring(with_p: bool) -> Result<Arc<RingQP>, Box<dyn Error>> {
        let p = if with_p {
            Some(Context::new_arc(P, 16)?)
        } else {
            None
        };
        Ok(Arc::new(RingQP::new(Context::new_arc(Q, 16)?, p)?))
    }

    /// Recombine the digits with the gadget vector over Q, divided by P.
    fn recompose(decomposer: &Decomposer, digits: &[Vec<PolyQP>], level: usize) -> Poly {
        let mut acc = Poly::zero(digits[0][0].q.ctx(), level, Representation::Ntt);
        for (i, row) in digits.iter().enumerate() {
            for (j, d) in row.iter().enumerate() {
                acc.fma_scalar_rns(&d.q, &decomposer.gadget_factor(i, j));
            }
        }
        acc
    }

    #[test]
    fn shapes() -> Result<(), Box<dyn Error>> {
        let ring_p = ring(true)?;
        let d = Decomposer::new(&ring_p, 2, Some(1), 0)?;
        assert_eq!(d.rns_count(), 2);
        assert_eq!(d.digit_count(), 1);
        assert_eq!(d.group(1, 2), 2..3);
        assert_eq!(d.rns_count_at(1), 1);

        let d = Decomposer::new(&ring_p, 2, Some(0), 0)?;
        assert_eq!(d.rns_count(), 3);

        let d = Decomposer::new(&ring_p, 2, Some(0), 5)?;
        assert_eq!(d.digit_count(), 13);
        let d = Decomposer::new(&ring(false)?, 2, None, 8)?;
        assert_eq!(d.rns_count(), 3);
        assert_eq!(d.digit_count(), 8);

        assert!(Decomposer::new(&ring_p, 2, Some(1), 5).is_err());
        assert!(Decomposer::new(&ring_p, 2, Some(0), 11).is_err());
        assert!(Decomposer::new(&ring_p, 3, Some(0), 0).is_err());
        assert!(Decomposer::new(&ring_p, 2, Some(2), 0).is_err());
        Ok(())
    }

    #[test]
    fn gadget_factors() -> Result<(), Box<dyn Error>> {
        let ring = ring(true)?;
        let d = Decomposer::new(&ring, 2, Some(1), 0)?;
        let p = BigUint::from(P[0]) * BigUint::from(P[1]);
        let f = d.gadget_factor(0, 0);
        assert_eq!(f.len(), 3);
        for k in 0..2 {
            assert_eq!(BigUint::from(f[k]), &p % Q[k]);
        }
        assert_eq!(f[2], 0);
        assert_eq!(d.gadget_factor(1, 0)[..2], [0, 0]);
        Ok(())
    }

    #[test]
    fn decompose_recompose() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        for (with_p, level_p, base_two) in [
            (true, Some(1), 0),
            (true, Some(0), 0),
            (true, Some(0), 7),
            (false, None, 0),
            (false, None, 9),
        ] {
            let ring = ring(with_p)?;
            let decomposer = Decomposer::new(&ring, 2, level_p, base_two)?;
            let extender = BasisExtender::new(&ring)?;
            for level in 0..3 {
                let c = Poly::random(ring.q(), level, Representation::Ntt, &mut rng);
                let digits = decomposer.decompose(&c)?;
                assert_eq!(digits.len(), decomposer.rns_count_at(level));
                assert!(digits.iter().all(|r| r.len() == decomposer.digit_count()));
                assert!(digits
                    .iter()
                    .flatten()
                    .all(|d| d.level_q() == level && d.level_p() == level_p));

                // The recomposition is c * P modulo Q since the extension
                // error is a multiple of the group modulus.
                let mut expected = c.clone();
                if let Some(level_p) = level_p {
                    let scalars = ring
                        .q()
                        .moduli_operators()
                        .iter()
                        .map(|qk| {
                            ring.p().map_or(1, |p| {
                                p.moduli()[..=level_p]
                                    .iter()
                                    .fold(1, |acc, pj| qk.mul(acc, qk.reduce(*pj)))
                            })
                        })
                        .collect::<Vec<_>>();
                    expected.mul_scalar_rns(&scalars);
                }
                assert_eq!(recompose(&decomposer, &digits, level), expected);

                // Dividing c * P lifted to QP by P gives back c.
                if level_p.is_some() {
                    let mut lifted = ring.zero(level, level_p, Representation::Ntt)?;
                    lifted.q = expected.clone();
                    assert_eq!(extender.mod_down(&lifted)?, c);
                }
            }
            let too_high = Poly::random(ring.q(), 2, Representation::Ntt, &mut rng);
            let low = Decomposer::new(&ring, 1, level_p, base_two)?;
            assert!(low.decompose(&too_high).is_err());
        }
        Ok(())
    }

    #[test]
    fn mod_down_of_small_multiple() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ring = ring(true)?;
        let extender = BasisExtender::new(&ring)?;

        // x = P * s + e over QP with small s and e, so x / P rounds to s up to
        // an error of at most the number of moduli of P.
        let s = ring.small(2, Some(1), Representation::PowerBasis, 0.5, &mut rng)?;
        let mut x = s.clone();
        let p_mod_q = ring
            .q()
            .moduli_operators()
            .iter()
            .map(|qk| qk.mul(qk.reduce(P[0]), qk.reduce(P[1])))
            .collect::<Vec<_>>();
        x.mul_scalar_rns(&p_mod_q, &[0, 0]);
        let e = ring.small(2, Some(1), Representation::PowerBasis, 4.0, &mut rng)?;
        x += &e;
        x.change_representation(Representation::Ntt);

        let mut out = extender.mod_down(&x)?;
        out.change_representation(Representation::PowerBasis);
        let mut s_q = s.q.clone();
        s_q.change_representation(Representation::PowerBasis);
        for row in 0..3 {
            for (a, b) in out.center_row(row)?.iter().zip(s_q.center_row(row)?) {
                assert!((a - b).abs() <= 2);
            }
        }

        let mut not_ntt = x.clone();
        not_ntt.change_representation(Representation::PowerBasis);
        assert!(extender.mod_down(&not_ntt).is_err());
        Ok(())
    }
}
