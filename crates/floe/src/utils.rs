// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

pub(crate) mod bin {
    use std::collections::VecDeque;
    use std::marker::PhantomData;

    use itertools::Itertools;

    struct Bin<T> {
        bin_weight: u64,
        target_weight: u64,
        items: Vec<T>,
    }

    impl<T> Bin<T> {
        fn new(target_weight: u64) -> Self {
            Bin {
                bin_weight: 0,
                target_weight,
                items: Vec::new(),
            }
        }

        fn can_add(&self, weight: u64) -> bool {
            self.bin_weight + weight <= self.target_weight
        }

        fn add(&mut self, item: T, weight: u64) {
            self.bin_weight += weight;
            self.items.push(item);
        }

        fn into_vec(self) -> Vec<T> {
            self.items
        }
    }

    /// ListPacker helps to pack items into bins of items where each bin's
    /// aggregate weight stays at or below `target_weight`.
    ///
    /// `lookback` bounds how many open bins an item is tried against. With a
    /// lookback of 1, each item is only compared against the most recently
    /// opened bin, so the concatenation of the bins equals the input list.
    pub(crate) struct ListPacker<T> {
        target_weight: u64,
        lookback: usize,
        _marker: PhantomData<T>,
    }

    impl<T> ListPacker<T> {
        pub fn new(target_weight: u64, lookback: usize) -> Self {
            ListPacker {
                target_weight,
                lookback: lookback.max(1),
                _marker: PhantomData,
            }
        }

        /// Packs items in input order.
        ///
        /// An item larger than the target weight occupies a freshly opened
        /// bin on its own.
        pub fn pack<F>(&self, items: Vec<T>, weight_func: F) -> Vec<Vec<T>>
        where
            F: Fn(&T) -> u64,
        {
            let mut sealed: Vec<Bin<T>> = vec![];
            let mut open: VecDeque<Bin<T>> = VecDeque::new();

            for item in items {
                let cur_weight = weight_func(&item);
                match open.iter_mut().find(|bin| bin.can_add(cur_weight)) {
                    Some(bin) => bin.add(item, cur_weight),
                    None => {
                        let mut bin = Bin::new(self.target_weight);
                        bin.add(item, cur_weight);
                        open.push_back(bin);
                        if open.len() > self.lookback {
                            // unwrap is safe, the deque cannot be empty here
                            sealed.push(open.pop_front().unwrap());
                        }
                    }
                }
            }
            sealed.extend(open);

            sealed.into_iter().map(|bin| bin.into_vec()).collect_vec()
        }

        /// Packs items from the end of the list.
        ///
        /// The concatenation of the returned bins in order equals the input
        /// list, and the under-filled bin (if any) is the first one.
        pub fn pack_end<F>(&self, mut items: Vec<T>, weight_func: F) -> Vec<Vec<T>>
        where
            F: Fn(&T) -> u64,
        {
            items.reverse();
            let mut bins = self.pack(items, weight_func);
            bins.reverse();
            for bin in bins.iter_mut() {
                bin.reverse();
            }
            bins
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_list_packer_basic_packing() {
            let packer = ListPacker::new(10, 1);
            let items = vec![3, 4, 5, 6, 2, 1];

            let packed = packer.pack(items, |&x| x);

            assert_eq!(packed, vec![vec![3, 4], vec![5], vec![6, 2, 1]]);
        }

        #[test]
        fn test_list_packer_single_large_item() {
            let packer = ListPacker::new(10, 1);
            let items = vec![15, 5, 3];

            let packed = packer.pack(items, |&x| x);

            assert_eq!(packed, vec![vec![15], vec![5, 3]]);
        }

        #[test]
        fn test_list_packer_empty_input() {
            let packer = ListPacker::new(10, 1);
            let items: Vec<u64> = vec![];

            let packed = packer.pack(items, |&x| x);

            assert_eq!(packed.len(), 0);
        }

        #[test]
        fn test_pack_end_preserves_order() {
            let packer = ListPacker::new(10, 1);
            let items = vec![3, 4, 5, 6, 2, 1];

            let packed = packer.pack_end(items.clone(), |&x| x);

            let flattened: Vec<u64> = packed.iter().flatten().copied().collect();
            assert_eq!(flattened, items);
            for bin in &packed {
                assert!(bin.iter().sum::<u64>() <= 10 || bin.len() == 1);
            }
        }

        #[test]
        fn test_pack_end_underfills_first_bin() {
            let packer = ListPacker::new(10, 1);
            // Packing from the end fills [2, 1, 6] oddly: the last bin is
            // full, the leftover weight lands in the first bin.
            let packed = packer.pack_end(vec![3, 4, 5, 6, 2, 1], |&x| x);

            assert_eq!(packed, vec![vec![3], vec![4, 5], vec![6, 2, 1]]);
            assert!(packed[0].iter().sum::<u64>() < 10);
        }

        #[test]
        fn test_pack_end_oversized_item_alone() {
            let packer = ListPacker::new(10, 1);
            let packed = packer.pack_end(vec![5, 15, 3], |&x| x);

            assert_eq!(packed, vec![vec![5], vec![15], vec![3]]);
        }

        #[test]
        fn test_lookback_two_reaches_earlier_bin() {
            let packer = ListPacker::new(10, 2);
            // With a lookback of 2, the `1` at the end still fits the first
            // opened bin even after a second bin was opened.
            let packed = packer.pack(vec![8, 9, 1], |&x| x);

            assert_eq!(packed, vec![vec![8, 1], vec![9]]);
        }
    }
}
