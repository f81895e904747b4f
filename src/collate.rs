//! Batch collation: turns a batch of per-sample tuples into one `Vec` per
//! field.

/// A fixed-arity sample that can be transposed into per-field columns.
pub trait Collate: Sized {
	type Output;

	fn collate<I: IntoIterator<Item = Self>>(batch: I) -> Self::Output;
}

macro_rules! impl_collate {
	($($name:ident : $idx:tt),+) => {
		impl<$($name),+> Collate for ($($name,)+) {
			type Output = ($(Vec<$name>,)+);

			#[allow(non_snake_case)]
			fn collate<I: IntoIterator<Item = Self>>(batch: I) -> Self::Output {
				let iter = batch.into_iter();
				let (lower, _) = iter.size_hint();
				$(let mut $name = Vec::with_capacity(lower);)+
				for sample in iter {
					$($name.push(sample.$idx);)+
				}
				($($name,)+)
			}
		}
	};
}

impl_collate!(A: 0);
impl_collate!(A: 0, B: 1);
impl_collate!(A: 0, B: 1, C: 2);
impl_collate!(A: 0, B: 1, C: 2, D: 3);
impl_collate!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_collate!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_collate!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_collate!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// `[(i1, t1), (i2, t2), ...]` becomes `([i1, i2, ...], [t1, t2, ...])`.
///
/// An empty batch yields empty columns.
pub fn collate_fn<T: Collate, I: IntoIterator<Item = T>>(batch: I) -> T::Output {
	T::collate(batch)
}
