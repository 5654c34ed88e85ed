//! Property-based tests for the CSR/COO conversion round trip and
//! renumbering under arbitrary sparse row layouts.

use lre_concurrency::Renumbering;
use lre_storage::CooMatrix;
use proptest::prelude::*;

fn arb_rows(max_rows: usize, max_j: u32) -> impl Strategy<Value = Vec<Vec<u32>>> {
    prop::collection::vec(
        prop::collection::vec(0..max_j, 0..6).prop_map(|mut v| {
            v.sort_unstable();
            v.dedup();
            v
        }),
        0..max_rows,
    )
}

proptest! {
    #[test]
    fn coo_to_csr_to_coo_round_trips(rows in arb_rows(20, 30)) {
        let mut coo = CooMatrix::new();
        for (r, factors) in rows.iter().enumerate() {
            for &j in factors {
                coo.push(r as u32, j);
            }
        }
        coo.sort();
        let expected = coo.entries().to_vec();

        let csr = coo.to_csr(rows.len() as u32).unwrap();
        prop_assert_eq!(csr.row_count(), rows.len() as u32);
        for (r, factors) in rows.iter().enumerate() {
            prop_assert_eq!(csr.row(r as u32), factors.as_slice());
        }

        let mut round_tripped = csr.to_coo().entries().to_vec();
        round_tripped.sort_unstable();
        prop_assert_eq!(round_tripped, expected);
    }

    #[test]
    fn renumbering_preserves_row_order_and_drops_removed_js(
        rows in arb_rows(10, 16),
        removed in prop::collection::vec(any::<bool>(), 16),
    ) {
        let mut coo = CooMatrix::new();
        for (r, factors) in rows.iter().enumerate() {
            for &j in factors {
                coo.push(r as u32, j);
            }
        }
        coo.sort();
        let mut csr = coo.to_csr(rows.len() as u32).unwrap();

        let renumbering = Renumbering::from_removed(16, &removed).unwrap();
        csr.remove_and_renumber_js(&renumbering);

        for (r, factors) in rows.iter().enumerate() {
            let expected: Vec<u32> = factors
                .iter()
                .filter(|&&j| renumbering.survives(j))
                .map(|&j| renumbering.get(j))
                .collect();
            prop_assert_eq!(csr.row(r as u32), expected.as_slice());
        }
    }
}
